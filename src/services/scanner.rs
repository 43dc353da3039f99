use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{TaggerError, TaggerResult};

pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Collect image files under `dir` whose extension matches one of
/// `extensions` (case-insensitive, leading dot optional). Only the top level
/// is scanned unless `recursive` is set. Sorted by path.
pub fn discover_images(
    dir: &Path,
    extensions: &[String],
    recursive: bool,
) -> TaggerResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TaggerError::NotFound(format!(
            "directory not found: {}",
            dir.display()
        )));
    }

    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)))
        })
        .collect();

    files.sort();
    tracing::info!(directory = %dir.display(), found = files.len(), "Discovered images");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.JPG", "c.png", "notes.txt", "d.WebP"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = discover_images(dir.path(), &exts(), false).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.JPG", "c.png", "d.WebP"]);
    }

    #[test]
    fn test_recursive_flag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("top.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("nested/deep.jpg"), b"x").unwrap();

        assert_eq!(discover_images(dir.path(), &exts(), false).unwrap().len(), 1);
        assert_eq!(discover_images(dir.path(), &exts(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory() {
        let err = discover_images(Path::new("/no/such/dir"), &exts(), false).unwrap_err();
        assert!(matches!(err, TaggerError::NotFound(_)));
    }
}
