//! Image views, owned grayscale buffers and interleaved pixel input.
//!
//! `ImageView` is a borrowed single-channel 2D view with an explicit stride
//! (elements between row starts). `PixelBuffer` is what the host pipeline
//! hands over: interleaved 8-bit samples with a channel count. Training
//! accepts any supported channel count and converts to grayscale; matching
//! insists on one channel.

use crate::util::{ShapeMatchError, ShapeMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the four corners clockwise from the top-left.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let x0 = self.x as f32;
        let y0 = self.y as f32;
        let x1 = (self.x + self.width) as f32;
        let y1 = (self.y + self.height) as f32;
        [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }
}

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ShapeMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> ShapeMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ShapeMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns row `y` trimmed to `width` elements.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Returns a zero-copy view of `rect` sharing the same backing buffer.
    pub fn roi(&self, rect: Rect) -> ShapeMatchResult<ImageView<'a, T>> {
        if rect.width == 0 || rect.height == 0 {
            return Err(ShapeMatchError::InvalidDimensions {
                width: rect.width,
                height: rect.height,
            });
        }
        let out_of_bounds = ShapeMatchError::RoiOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = rect.x.checked_add(rect.width);
        let end_y = rect.y.checked_add(rect.height);
        match (end_x, end_y) {
            (Some(ex), Some(ey)) if ex <= self.width && ey <= self.height => {}
            _ => return Err(out_of_bounds),
        }

        let start = rect.y * self.stride + rect.x;
        let data = self.data.get(start..).ok_or(ShapeMatchError::BufferTooSmall {
            needed: start + 1,
            got: self.data.len(),
        })?;
        ImageView::new(data, rect.width, rect.height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ShapeMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(ShapeMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ShapeMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ShapeMatchError::InvalidDimensions { width, height })
}

/// Owned contiguous grayscale image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> ShapeMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ShapeMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(ShapeMatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(ShapeMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> ShapeMatchResult<Self> {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(ShapeMatchError::BufferTooSmall {
                needed: (y + 1) * view.stride(),
                got: view.data.len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, view.width(), view.height())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

/// Interleaved 8-bit image as delivered by the host pipeline.
#[derive(Copy, Clone, Debug)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: usize,
}

impl<'a> PixelBuffer<'a> {
    /// Wraps a contiguous interleaved buffer. Supported channel counts are
    /// 1 (gray), 3 (RGB) and 4 (RGBA).
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> ShapeMatchResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ShapeMatchError::InvalidInput("channels must be 1, 3 or 4"));
        }
        if width == 0 || height == 0 {
            return Err(ShapeMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(ShapeMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ShapeMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Single-channel convenience constructor.
    pub fn gray(data: &'a [u8], width: usize, height: usize) -> ShapeMatchResult<Self> {
        Self::new(data, width, height, 1)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns a grayscale view, failing for multi-channel buffers.
    pub fn as_gray(&self) -> ShapeMatchResult<ImageView<'a, u8>> {
        if self.channels != 1 {
            return Err(ShapeMatchError::InputChannelMismatch {
                channels: self.channels,
            });
        }
        ImageView::from_slice(self.data, self.width, self.height)
    }

    /// Converts to an owned grayscale image using BT.601 luma weights.
    pub fn to_gray(&self) -> ShapeMatchResult<OwnedImage> {
        let count = self.width * self.height;
        let data = match self.channels {
            1 => self.data[..count].to_vec(),
            c => self.data[..count * c]
                .chunks_exact(c)
                .map(|px| {
                    let luma = 299 * u32::from(px[0])
                        + 587 * u32::from(px[1])
                        + 114 * u32::from(px[2]);
                    ((luma + 500) / 1000) as u8
                })
                .collect(),
        };
        OwnedImage::new(data, self.width, self.height)
    }
}
