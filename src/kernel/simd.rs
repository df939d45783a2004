//! Vectorized kernel using the `wide` crate.
//!
//! Gradient rows and pose scores are processed eight lanes at a time with
//! `f32x8`. Pose scoring gathers the image gradient at each point's indexed
//! offset, so the vector win comes from the dot product, the reciprocal
//! normalization and the masking rather than from contiguous loads. Leftover
//! lanes fall through to the scalar code path.

use crate::gradient::GradientField;
use crate::kernel::scalar::{gradient_row_scalar, score_tail, SMOOTH};
use crate::kernel::{
    early_exit_checkpoint, Kernel, PoseOffsets, ScoreParams, LANES, MIN_MAGNITUDE,
};
use wide::{f32x8, CmpGt};

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn store_f32x8(v: f32x8, out: &mut [f32]) {
    out[..LANES].copy_from_slice(&v.to_array());
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// `f32x8` implementation of the matcher kernels.
pub struct SimdKernel;

impl Kernel for SimdKernel {
    fn name(&self) -> &'static str {
        "simd-f32x8"
    }

    fn gradient_row(&self, rows: [&[f32]; 3], gx: &mut [f32], gy: &mut [f32], mag: &mut [f32]) {
        let [above, row, below] = rows;
        let width = gx.len();
        let simd_end = width / LANES * LANES;
        let w0 = f32x8::splat(SMOOTH[0]);
        let w1 = f32x8::splat(SMOOTH[1]);

        let mut x = 0;
        while x < simd_end {
            let a_l = load_f32x8(&above[x..]);
            let a_m = load_f32x8(&above[x + 1..]);
            let a_r = load_f32x8(&above[x + 2..]);
            let r_l = load_f32x8(&row[x..]);
            let r_r = load_f32x8(&row[x + 2..]);
            let b_l = load_f32x8(&below[x..]);
            let b_m = load_f32x8(&below[x + 1..]);
            let b_r = load_f32x8(&below[x + 2..]);

            let sx = w0 * (a_r - a_l) + w1 * (r_r - r_l) + w0 * (b_r - b_l);
            let sy = w0 * (b_l - a_l) + w1 * (b_m - a_m) + w0 * (b_r - a_r);
            let m = (sx * sx + sy * sy).sqrt();

            store_f32x8(sx, &mut gx[x..]);
            store_f32x8(sy, &mut gy[x..]);
            store_f32x8(m, &mut mag[x..]);
            x += LANES;
        }

        gradient_row_scalar(rows, simd_end, gx, gy, mag);
    }

    fn score_pose(
        &self,
        field: &GradientField,
        center: usize,
        pose: PoseOffsets<'_>,
        params: ScoreParams,
    ) -> f32 {
        let n = pose.len();
        if n == 0 {
            return 0.0;
        }
        let checkpoint = early_exit_checkpoint(n, &params);
        let floor = params.exit_floor();
        let gx = field.gx();
        let gy = field.gy();
        let mag = field.mag();
        let eps = f32x8::splat(MIN_MAGNITUDE);
        let one = f32x8::splat(1.0);
        let simd_end = n / LANES * LANES;

        let mut sum = 0.0f32;
        let mut i = 0;
        while i < simd_end {
            let mut g_x = [0.0f32; LANES];
            let mut g_y = [0.0f32; LANES];
            let mut g_m = [0.0f32; LANES];
            for lane in 0..LANES {
                let idx = (center as isize + pose.offsets[i + lane]) as usize;
                g_x[lane] = gx[idx];
                g_y[lane] = gy[idx];
                g_m[lane] = mag[idx];
            }
            let g_m = f32x8::from(g_m);
            let dot = load_f32x8(&pose.dir_x[i..]) * f32x8::from(g_x)
                + load_f32x8(&pose.dir_y[i..]) * f32x8::from(g_y);

            let valid = g_m.simd_gt(eps);
            let inv = valid.blend(one / g_m, f32x8::ZERO);
            let mut cos = dot * inv;
            if params.contrast_invariant {
                cos = cos.abs();
            }
            sum += hsum(cos);
            i += LANES;

            if i == checkpoint && sum / (i as f32) < floor {
                return 0.0;
            }
        }

        match score_tail(field, center, pose, &params, simd_end, sum, checkpoint) {
            Some(total) => total / n as f32,
            None => 0.0,
        }
    }
}
