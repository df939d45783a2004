//! Image pyramid construction for grayscale `u8` images.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. A coarse pixel `u` therefore covers
//! full-resolution pixels `2u` and `2u + 1`, with its center at `2u + 0.5`.

use crate::image::{ImageView, OwnedImage};
use crate::util::ShapeMatchResult;

/// Halves an image with a 2x2 box filter. Odd trailing rows/columns are dropped.
pub fn downsample_u8(src: ImageView<'_, u8>) -> ShapeMatchResult<OwnedImage> {
    let dst_width = (src.width() / 2).max(1);
    let dst_height = (src.height() / 2).max(1);
    let mut dst = vec![0u8; dst_width * dst_height];
    let last_x = src.width() - 1;
    let last_y = src.height() - 1;

    for y in 0..dst_height {
        let row0 = src.row((2 * y).min(last_y)).unwrap_or(&[]);
        let row1 = src.row((2 * y + 1).min(last_y)).unwrap_or(&[]);
        for x in 0..dst_width {
            let x0 = (2 * x).min(last_x);
            let x1 = (2 * x + 1).min(last_x);
            let sum = u16::from(row0[x0])
                + u16::from(row0[x1])
                + u16::from(row1[x0])
                + u16::from(row1[x1]);
            dst[y * dst_width + x] = ((sum + 2) / 4) as u8;
        }
    }

    OwnedImage::new(dst, dst_width, dst_height)
}

/// Owned image pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<OwnedImage>,
}

impl ImagePyramid {
    /// Builds a pyramid from a base grayscale view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present. Halving stops early once a level would drop below 2 pixels.
    pub fn build_u8(base: ImageView<'_, u8>, max_levels: usize) -> ShapeMatchResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![OwnedImage::from_view(base)?];

        while levels.len() < max_levels {
            let Some(prev) = levels.last() else { break };
            if prev.width() < 4 || prev.height() < 4 {
                break;
            }
            let next = downsample_u8(prev.view())?;
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Returns the number of levels actually built.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(|level| level.view())
    }

    /// Returns the coarsest level.
    pub fn coarsest(&self) -> Option<ImageView<'_, u8>> {
        self.levels.last().map(|level| level.view())
    }
}

#[cfg(test)]
mod tests {
    use super::ImagePyramid;
    use crate::image::ImageView;

    #[test]
    fn box_filter_rounds_and_halves() {
        let data = [0u8, 2, 4, 6, 1, 3, 5, 7];
        let view = ImageView::from_slice(&data, 4, 2).unwrap();
        let pyramid = ImagePyramid::build_u8(view, 2).unwrap();
        assert_eq!(pyramid.len(), 1, "2-row image cannot be halved further");

        let data = vec![10u8; 16 * 8];
        let view = ImageView::from_slice(&data, 16, 8).unwrap();
        let pyramid = ImagePyramid::build_u8(view, 3).unwrap();
        assert_eq!(pyramid.len(), 3);
        let coarse = pyramid.coarsest().unwrap();
        assert_eq!((coarse.width(), coarse.height()), (4, 2));
        assert_eq!(*coarse.get(1, 1).unwrap(), 10);
    }
}
