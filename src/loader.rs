//! Image decoding from disk.

use crate::error::ImageError;
use crate::render::{PixelBuffer, Size, fit_size};

use image::imageops::FilterType;
use log::debug;
use std::path::Path;

/// Decodes an image file into a buffer scaled to fit a target size.
pub trait ImageLoader: Send {
    /// Load `path`, scaled to fit inside `target` with its aspect preserved.
    fn load_and_scale(&self, path: &Path, target: Size) -> Result<PixelBuffer, ImageError>;
}

/// Loads images from the filesystem with the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct FsImageLoader {
    filter: FilterType,
}

impl FsImageLoader {
    /// Create a loader using a triangle (bilinear) filter.
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    /// Create a loader with a specific resize filter.
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for FsImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for FsImageLoader {
    fn load_and_scale(&self, path: &Path, target: Size) -> Result<PixelBuffer, ImageError> {
        if !path.is_file() {
            return Err(ImageError::NotFound(path.to_path_buf()));
        }

        let decoded = image::open(path).map_err(|e| ImageError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let original = Size::new(decoded.width(), decoded.height());
        let fitted = fit_size(target, original);
        let rgba = if fitted == original {
            decoded.to_rgba8()
        } else {
            image::imageops::resize(&decoded.to_rgba8(), fitted.width, fitted.height, self.filter)
        };
        debug!(
            "decoded {} ({}x{} -> {}x{})",
            path.display(),
            original.width,
            original.height,
            fitted.width,
            fitted.height
        );

        let size = Size::new(rgba.width(), rgba.height());
        PixelBuffer::from_rgba(size, rgba.into_raw()).ok_or_else(|| ImageError::Decode {
            path: path.to_path_buf(),
            reason: "decoder returned a short buffer".to_string(),
        })
    }
}
