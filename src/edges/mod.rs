//! Edge extraction on a gradient field.
//!
//! `canny` thins the gradient with non-maximum suppression and links it with
//! two-threshold hysteresis; `corner` provides a normalized Harris response
//! used to rank edge points during training.

mod canny;
mod corner;

pub use canny::{hysteresis_edges, EdgeMask};
pub use corner::harris_response;

use crate::gradient::GradientField;
use crate::util::math::direction_deg;

/// Hysteresis threshold pair on gradient magnitude.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl EdgeThresholds {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Derives thresholds from the strongest response: `high = 0.3 * max`,
    /// `low = high / 2`, both at least 1.
    pub fn auto(field: &GradientField) -> Self {
        let max = field.mag().iter().copied().fold(0.0f32, f32::max);
        let high = (0.3 * max).max(1.0);
        let low = (0.5 * high).max(1.0);
        Self { low, high }
    }
}

/// An edge pixel with its gradient direction, used for voting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePixel {
    pub x: u32,
    pub y: u32,
    /// Gradient direction in degrees within [0, 360).
    pub dir_deg: f32,
}

/// Lists the set pixels of `mask` in raster order with their directions.
pub fn edge_pixels(field: &GradientField, mask: &EdgeMask) -> Vec<EdgePixel> {
    let width = field.width();
    let gx = field.gx();
    let gy = field.gy();
    mask.iter_set()
        .map(|idx| EdgePixel {
            x: (idx % width) as u32,
            y: (idx / width) as u32,
            dir_deg: direction_deg(gx[idx], gy[idx]),
        })
        .collect()
}
