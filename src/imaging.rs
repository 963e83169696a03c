//! Image decoding
//!
//! Projects store their images as encoded bytes (PNG, JPEG, WebP...).
//! This module turns those bytes into RGBA bitmaps the render layer can
//! display directly, and produces downscaled copies for list thumbnails.

use image::{imageops::FilterType, DynamicImage, RgbaImage};
use std::fmt;
use std::sync::Arc;
use tokio::task;

use crate::error::DecodeError;

/// A decoded, displayable bitmap
///
/// Cloning is cheap (the pixels are shared). Two handles are equal when
/// their dimensions and pixels are equal.
#[derive(Clone, PartialEq)]
pub struct ImageHandle {
    pixels: Arc<RgbaImage>,
}

impl ImageHandle {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw RGBA8 pixel data, row-major
    pub fn rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Downscale so the longest edge is at most `max_edge`, keeping the aspect ratio
    ///
    /// Images already within bounds are returned as-is.
    pub fn thumbnail(&self, max_edge: u32) -> ImageHandle {
        if self.width() <= max_edge && self.height() <= max_edge {
            return self.clone();
        }
        let img = DynamicImage::ImageRgba8((*self.pixels).clone());
        let resized = img.resize(max_edge, max_edge, FilterType::Lanczos3);
        ImageHandle::from_rgba(resized.to_rgba8())
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Decode an encoded image payload
///
/// The format is guessed from the payload's magic bytes. Fails on empty or
/// malformed input.
pub fn decode(bytes: &[u8]) -> Result<ImageHandle, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let img = image::load_from_memory(bytes)?;
    Ok(ImageHandle::from_rgba(img.to_rgba8()))
}

/// Decode on the blocking pool so the caller's executor thread stays free
pub async fn decode_async(bytes: Vec<u8>) -> Result<ImageHandle, DecodeError> {
    task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))?
}
