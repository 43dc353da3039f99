use std::path::Path;

use crate::error::{TaggerError, TaggerResult};

/// Labels offered when no vocabulary file is configured.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "person", "people", "child", "portrait", "selfie", "group photo",
    "dog", "cat", "bird", "horse", "animal", "pet",
    "food", "drink", "dessert", "restaurant",
    "car", "bicycle", "train", "airplane", "boat", "street",
    "city", "building", "architecture", "church", "bridge", "night",
    "nature", "landscape", "mountain", "forest", "tree", "flower",
    "beach", "sea", "lake", "river", "sky", "sunset", "snow", "rain",
    "indoor", "outdoor", "home", "office", "kitchen", "garden",
    "party", "wedding", "birthday", "concert", "sport", "travel",
    "document", "screenshot", "text", "art", "toy", "book",
];

/// Owned copy of [`DEFAULT_VOCABULARY`].
pub fn default_vocabulary() -> Vec<String> {
    DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect()
}

/// Read one label per line. Blank lines and `#` comments are skipped.
pub fn load_vocabulary(path: &Path) -> TaggerResult<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TaggerError::Configuration(format!("vocabulary file {}: {e}", path.display()))
    })?;

    let labels: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(TaggerError::Configuration(format!(
            "vocabulary file {} has no labels",
            path.display()
        )));
    }
    Ok(labels)
}
