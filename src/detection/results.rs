//! Annotated result images on disk.
//!
//! Results land in a `results/` directory next to the source image, keeping
//! the source file name.

use crate::error::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// `<source dir>/results/<source file name>`
pub fn result_path(source: &Path) -> PathBuf {
    let dir = source.parent().unwrap_or(Path::new(".")).join("results");
    match source.file_name() {
        Some(name) => dir.join(name),
        None => dir.join("result.png"),
    }
}

/// Write `image` to [`result_path`], creating the directory if needed
pub fn save_result(source: &Path, image: &RgbImage) -> Result<PathBuf> {
    let path = result_path(source);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    image.save(&path)?;
    log::info!("Result image saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_result_path() {
        assert_eq!(
            result_path(Path::new("/data/scenes/harbor.jpg")),
            PathBuf::from("/data/scenes/results/harbor.jpg")
        );
    }

    #[test]
    fn test_save_result_creates_directory() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("scene.png");
        let saved = save_result(&source, &RgbImage::new(3, 3)).unwrap();

        assert_eq!(saved, dir.path().join("results").join("scene.png"));
        assert!(saved.exists());
        // Second save overwrites in place
        assert!(save_result(&source, &RgbImage::new(3, 3)).is_ok());
    }
}
