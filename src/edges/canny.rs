//! Non-maximum suppression and hysteresis linking.
//!
//! A pixel survives suppression when its magnitude is a local maximum along
//! the gradient direction quantized to 4 orientations. On a two-pixel
//! plateau the pixel further along the gradient wins. The outermost 1-pixel
//! frame is never an edge. Weak pixels (`>= low`) are kept only when
//! 8-connected to a strong pixel (`>= high`).

use crate::edges::EdgeThresholds;
use crate::gradient::GradientField;

const TAN_22_5_DEG: f32 = 0.414_213_57;

const STRONG: u8 = 2;
const WEAK: u8 = 1;

/// Binary edge mask (`1` = edge) with the field's dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeMask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl EdgeMask {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] != 0
    }

    /// Number of edge pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Linear indices of edge pixels in raster order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(idx, _)| idx)
    }
}

/// Classifies one pixel after suppression: 0, `WEAK` or `STRONG`.
fn suppress(field: &GradientField, x: usize, y: usize, thresholds: EdgeThresholds) -> u8 {
    let w = field.width();
    let mag = field.mag();
    let idx = y * w + x;
    let m = mag[idx];
    if m < thresholds.low {
        return 0;
    }

    let gx = field.gx()[idx];
    let gy = field.gy()[idx];
    let abs_gx = gx.abs();
    let abs_gy = gy.abs();
    let same_sign = (gx >= 0.0) == (gy >= 0.0);

    // (before, after) along the gradient
    let (before, after) = if abs_gy <= abs_gx * TAN_22_5_DEG {
        (mag[idx - 1], mag[idx + 1])
    } else if abs_gx <= abs_gy * TAN_22_5_DEG {
        (mag[idx - w], mag[idx + w])
    } else if same_sign {
        (mag[idx - w - 1], mag[idx + w + 1])
    } else {
        (mag[idx - w + 1], mag[idx + w - 1])
    };

    if m < before || m <= after {
        return 0;
    }
    if m >= thresholds.high {
        STRONG
    } else {
        WEAK
    }
}

/// Runs suppression and hysteresis over the whole field.
pub fn hysteresis_edges(field: &GradientField, thresholds: EdgeThresholds) -> EdgeMask {
    let width = field.width();
    let height = field.height();
    let mut data = vec![0u8; width * height];
    if width < 3 || height < 3 {
        return EdgeMask {
            width,
            height,
            data,
        };
    }

    let mut stack = Vec::new();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let class = suppress(field, x, y, thresholds);
            let idx = y * width + x;
            data[idx] = class;
            if class == STRONG {
                stack.push(idx);
            }
        }
    }

    // grow strong seeds through weak neighbours
    while let Some(idx) = stack.pop() {
        let x = idx % width;
        let y = idx / width;
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                let nidx = ny * width + nx;
                if data[nidx] == WEAK {
                    data[nidx] = STRONG;
                    stack.push(nidx);
                }
            }
        }
    }

    for v in data.iter_mut() {
        *v = u8::from(*v == STRONG);
    }

    EdgeMask {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::hysteresis_edges;
    use crate::edges::EdgeThresholds;
    use crate::gradient::GradientField;
    use crate::image::ImageView;
    use crate::kernel::scalar::ScalarKernel;

    fn field_from(data: &[u8], width: usize, height: usize) -> GradientField {
        let view = ImageView::from_slice(data, width, height).unwrap();
        GradientField::build(view, &ScalarKernel).unwrap()
    }

    #[test]
    fn step_edge_is_one_pixel_wide() {
        let (w, h) = (12, 10);
        let data: Vec<u8> = (0..w * h).map(|i| if i % w >= 6 { 200 } else { 10 }).collect();
        let field = field_from(&data, w, h);
        let mask = hysteresis_edges(&field, EdgeThresholds::new(50.0, 150.0));
        for y in 1..h - 1 {
            let row: Vec<usize> = (0..w).filter(|&x| mask.is_edge(x, y)).collect();
            assert_eq!(row, vec![6], "row {y}");
        }
        assert!(!mask.is_edge(6, 0));
    }

    #[test]
    fn weak_edges_need_a_strong_neighbour() {
        let (w, h) = (12, 10);
        // faint step only: every pixel is weak, none strong
        let data: Vec<u8> = (0..w * h).map(|i| if i % w >= 6 { 40 } else { 10 }).collect();
        let field = field_from(&data, w, h);
        let mask = hysteresis_edges(&field, EdgeThresholds::new(50.0, 150.0));
        assert_eq!(mask.count(), 0);
        let mask = hysteresis_edges(&field, EdgeThresholds::new(50.0, 100.0));
        assert_eq!(mask.count(), h - 2);
    }
}
