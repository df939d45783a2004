//! Harris corner response normalized to [0, 1].

use crate::gradient::GradientField;

const HARRIS_K: f32 = 0.04;

/// Computes `det(M) - k * trace(M)^2` of the 3x3 structure tensor per pixel,
/// clamps negatives to 0 and divides by the maximum. Flat or purely straight
/// images yield all zeros.
pub fn harris_response(field: &GradientField) -> Vec<f32> {
    let width = field.width();
    let height = field.height();
    let n = width * height;
    let gx = field.gx();
    let gy = field.gy();

    // gradients are scaled down so products of 1020-sized values stay well
    // inside f32 precision
    let scale = 1.0 / 1024.0;
    let mut xx = vec![0.0f32; n];
    let mut yy = vec![0.0f32; n];
    let mut xy = vec![0.0f32; n];
    for i in 0..n {
        let a = gx[i] * scale;
        let b = gy[i] * scale;
        xx[i] = a * a;
        yy[i] = b * b;
        xy[i] = a * b;
    }

    let mut response = vec![0.0f32; n];
    let mut max = 0.0f32;
    for y in 0..height {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
            for yy_ in y0..=y1 {
                let base = yy_ * width;
                for xx_ in x0..=x1 {
                    sxx += xx[base + xx_];
                    syy += yy[base + xx_];
                    sxy += xy[base + xx_];
                }
            }
            let trace = sxx + syy;
            let r = (sxx * syy - sxy * sxy - HARRIS_K * trace * trace).max(0.0);
            response[y * width + x] = r;
            max = max.max(r);
        }
    }

    if max > 0.0 {
        let inv = 1.0 / max;
        for r in response.iter_mut() {
            *r *= inv;
        }
    }
    response
}
