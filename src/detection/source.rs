//! Image acquisition.
//!
//! The camera is an external collaborator behind [`ImageSource`]. The
//! shipped [`DirectorySource`] serves demo scenes from disk, picking one image
//! per request with the session's random generator.

use crate::error::AcquisitionError;
use image::RgbImage;
use log::debug;
use rand::{Rng, RngCore};
use std::path::{Path, PathBuf};

/// File extensions treated as images (compared case-insensitively)
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// One acquired image
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Where the image came from, for logs and result files
    pub path: PathBuf,
}

/// Source of images for the detector
pub trait ImageSource {
    /// Produce the next image; `rng` is owned by the calling session
    fn acquire(&mut self, rng: &mut dyn RngCore) -> Result<Frame, AcquisitionError>;
}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn acquire(&mut self, rng: &mut dyn RngCore) -> Result<Frame, AcquisitionError> {
        (**self).acquire(rng)
    }
}

/// Serves a single image file, or a random image from a directory
///
/// The directory is rescanned on every acquisition so scenes can be added
/// while the board runs.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: expand_home(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for DirectorySource {
    fn acquire(&mut self, rng: &mut dyn RngCore) -> Result<Frame, AcquisitionError> {
        let candidates = list_images(&self.path)?;
        let chosen = &candidates[rng.gen_range(0..candidates.len())];
        debug!(
            "Acquiring {} ({} candidates)",
            chosen.display(),
            candidates.len()
        );
        load_frame(chosen)
    }
}

/// Decode one image file as RGB8
pub fn load_frame(path: &Path) -> Result<Frame, AcquisitionError> {
    let image = image::open(path)
        .map_err(|source| AcquisitionError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    Ok(Frame {
        image,
        path: path.to_path_buf(),
    })
}

/// Image files at `path`, sorted by name
///
/// A file path yields itself; a directory yields its image files (not
/// recursive). Errors if nothing usable is found.
pub fn list_images(path: &Path) -> Result<Vec<PathBuf>, AcquisitionError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(AcquisitionError::NotFound(path.to_path_buf()));
    }

    let scan_err = |source| AcquisitionError::Scan {
        path: path.to_path_buf(),
        source,
    };
    let mut images = Vec::new();
    for entry in std::fs::read_dir(path).map_err(scan_err)? {
        let entry_path = entry.map_err(scan_err)?.path();
        if entry_path.is_file() && is_image_file(&entry_path) {
            images.push(entry_path);
        }
    }

    if images.is_empty() {
        return Err(AcquisitionError::Empty(path.to_path_buf()));
    }
    images.sort();
    Ok(images)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Replace a leading `~` with `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    match (text.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => {
            let mut expanded = PathBuf::from(home);
            let rest = rest.trim_start_matches('/');
            if !rest.is_empty() {
                expanded.push(rest);
            }
            expanded
        }
        _ => path.to_path_buf(),
    }
}
