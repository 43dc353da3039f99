use image::DynamicImage;
use std::path::Path;

use crate::error::{TaggerError, TaggerResult};

/// Largest side kept by default before scoring.
pub const DEFAULT_MAX_SIDE: u32 = 1024;

/// Decode an image from disk, normalize to RGB and downscale so that neither
/// side exceeds `max_side`. Blocking; call from the blocking pool.
pub fn load_image(path: &Path, max_side: u32) -> TaggerResult<DynamicImage> {
    if !path.is_file() {
        return Err(TaggerError::NotFound(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let decoded = image::ImageReader::open(path)
        .map_err(|e| TaggerError::NotFound(format!("{}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| TaggerError::Inference(format!("{}: {e}", path.display())))?
        .decode()
        .map_err(|e| {
            TaggerError::Inference(format!("unreadable image {}: {e}", path.display()))
        })?;

    let mut img = DynamicImage::ImageRgb8(decoded.to_rgb8());

    if img.width() > max_side || img.height() > max_side {
        img = img.thumbnail(max_side, max_side);
        tracing::debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "Image downscaled"
        );
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_image(Path::new("/definitely/not/here.jpg"), DEFAULT_MAX_SIDE).unwrap_err();
        assert!(matches!(err, TaggerError::NotFound(_)));
    }

    #[test]
    fn test_garbage_file_is_inference_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let err = load_image(&path, DEFAULT_MAX_SIDE).unwrap_err();
        assert!(matches!(err, TaggerError::Inference(_)));
    }

    #[test]
    fn test_rgba_converted_and_downscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        ImageBuffer::from_pixel(200, 50, Rgba([10u8, 20, 30, 128]))
            .save(&path)
            .unwrap();

        let img = load_image(&path, 100).unwrap();
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 25);
    }

    #[test]
    fn test_small_image_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        ImageBuffer::from_pixel(32, 16, Rgba([0u8, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let img = load_image(&path, DEFAULT_MAX_SIDE).unwrap();
        assert_eq!((img.width(), img.height()), (32, 16));
    }
}
