//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::OwnedImage;
use crate::util::{ShapeMatchError, ShapeMatchResult};
use std::path::Path;

/// Interleaved pixels decoded from disk, kept with their channel count.
pub struct LoadedPixels {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl LoadedPixels {
    /// Borrows the decoded samples as a [`PixelBuffer`](crate::PixelBuffer).
    pub fn buffer(&self) -> ShapeMatchResult<crate::PixelBuffer<'_>> {
        crate::PixelBuffer::new(&self.data, self.width, self.height, self.channels)
    }
}

fn open(path: &Path) -> ShapeMatchResult<image::DynamicImage> {
    image::open(path).map_err(|err| ShapeMatchError::ImageIo {
        reason: err.to_string(),
    })
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> ShapeMatchResult<OwnedImage> {
    OwnedImage::new(img.as_raw().clone(), img.width() as usize, img.height() as usize)
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> ShapeMatchResult<OwnedImage> {
    let img = open(path.as_ref())?;
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image keeping gray, RGB or RGBA layout (other formats become RGB).
pub fn load_pixels<P: AsRef<Path>>(path: P) -> ShapeMatchResult<LoadedPixels> {
    let img = open(path.as_ref())?;
    let width = img.width() as usize;
    let height = img.height() as usize;
    let (data, channels) = match img {
        image::DynamicImage::ImageLuma8(gray) => (gray.into_raw(), 1),
        image::DynamicImage::ImageRgba8(rgba) => (rgba.into_raw(), 4),
        other => (other.to_rgb8().into_raw(), 3),
    };
    Ok(LoadedPixels {
        data,
        width,
        height,
        channels,
    })
}
