//! Full-resolution gradient field of a grayscale image.
//!
//! The field stores raw `gx`, `gy` and `mag = sqrt(gx^2 + gy^2)` from a
//! normalized 3x3 Scharr filter (same gain as Sobel, better rotational
//! symmetry). Borders replicate the outermost pixel. One field is built per
//! matching call and shared read-only by every model's voter and refiner.

use crate::image::ImageView;
use crate::kernel::Kernel;
use crate::trace::trace_span;
use crate::util::{ShapeMatchError, ShapeMatchResult};

/// Per-pixel gradient buffers in row-major order.
#[derive(Clone, Debug)]
pub struct GradientField {
    width: usize,
    height: usize,
    gx: Vec<f32>,
    gy: Vec<f32>,
    mag: Vec<f32>,
}

impl GradientField {
    /// Computes the gradient of `image` with the given kernel.
    pub fn build(image: ImageView<'_, u8>, kernel: &dyn Kernel) -> ShapeMatchResult<Self> {
        let width = image.width();
        let height = image.height();
        let _span = trace_span!("gradient_field", width = width, height = height).entered();

        let n = width * height;
        let mut gx = vec![0.0f32; n];
        let mut gy = vec![0.0f32; n];
        let mut mag = vec![0.0f32; n];

        // three rolling padded rows
        let padded = width + 2;
        let mut ring = vec![vec![0.0f32; padded]; 3];
        let fill = |dst: &mut Vec<f32>, y: usize| -> ShapeMatchResult<()> {
            let row = image.row(y).ok_or(ShapeMatchError::BufferTooSmall {
                needed: (y + 1) * image.stride(),
                got: y * image.stride(),
            })?;
            for (d, &s) in dst[1..=width].iter_mut().zip(row) {
                *d = f32::from(s);
            }
            dst[0] = dst[1];
            dst[width + 1] = dst[width];
            Ok(())
        };

        fill(&mut ring[0], 0)?;
        let first = ring[0].clone();
        if height > 1 {
            fill(&mut ring[2], 1)?;
        } else {
            ring[2] = first.clone();
        }
        ring[1] = first;

        for y in 0..height {
            let start = y * width;
            let end = start + width;
            kernel.gradient_row(
                [&ring[0], &ring[1], &ring[2]],
                &mut gx[start..end],
                &mut gy[start..end],
                &mut mag[start..end],
            );
            if y + 1 < height {
                ring.rotate_left(1);
                // ring[2] now holds the old "above" row; refill or replicate
                if y + 2 < height {
                    fill(&mut ring[2], y + 2)?;
                } else {
                    let last = ring[1].clone();
                    ring[2] = last;
                }
            }
        }

        Ok(Self {
            width,
            height,
            gx,
            gy,
            mag,
        })
    }

    /// Assembles a field from precomputed buffers of `width * height` samples.
    pub fn from_parts(
        width: usize,
        height: usize,
        gx: Vec<f32>,
        gy: Vec<f32>,
        mag: Vec<f32>,
    ) -> ShapeMatchResult<Self> {
        let n = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(ShapeMatchError::InvalidDimensions { width, height })?;
        for buf in [&gx, &gy, &mag] {
            if buf.len() != n {
                return Err(ShapeMatchError::BufferTooSmall {
                    needed: n,
                    got: buf.len(),
                });
            }
        }
        Ok(Self {
            width,
            height,
            gx,
            gy,
            mag,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn gx(&self) -> &[f32] {
        &self.gx
    }

    pub fn gy(&self) -> &[f32] {
        &self.gy
    }

    pub fn mag(&self) -> &[f32] {
        &self.mag
    }

    /// Returns `(gx, gy, mag)` at `(x, y)` if in bounds.
    pub fn at(&self, x: usize, y: usize) -> Option<(f32, f32, f32)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        Some((self.gx[idx], self.gy[idx], self.mag[idx]))
    }
}
