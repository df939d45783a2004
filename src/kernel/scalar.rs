//! Portable reference kernel.

use crate::gradient::GradientField;
use crate::kernel::{
    early_exit_checkpoint, Kernel, PoseOffsets, ScoreParams, VotePlan, MIN_MAGNITUDE,
};
use crate::util::math::{bin_offset, direction_bin, DIRECTION_BINS};

/// Horizontal Scharr taps normalized to the Sobel gain (weights sum to 4).
pub(crate) const SMOOTH: [f32; 3] = [0.75, 2.5, 0.75];

/// Bin distance between opposite directions.
const HALF_TURN: isize = (DIRECTION_BINS / 2) as isize;

/// Scalar kernel used when no vector unit is available.
pub struct ScalarKernel;

impl Kernel for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn gradient_row(&self, rows: [&[f32]; 3], gx: &mut [f32], gy: &mut [f32], mag: &mut [f32]) {
        gradient_row_scalar(rows, 0, gx, gy, mag);
    }

    fn score_pose(
        &self,
        field: &GradientField,
        center: usize,
        pose: PoseOffsets<'_>,
        params: ScoreParams,
    ) -> f32 {
        score_pose_scalar(field, center, pose, params)
    }
}

/// Filters output columns `start..gx.len()` of one padded row triple.
pub(crate) fn gradient_row_scalar(
    rows: [&[f32]; 3],
    start: usize,
    gx: &mut [f32],
    gy: &mut [f32],
    mag: &mut [f32],
) {
    let [above, row, below] = rows;
    for x in start..gx.len() {
        // padded column x + 1 is the output pixel
        let dx_above = above[x + 2] - above[x];
        let dx_row = row[x + 2] - row[x];
        let dx_below = below[x + 2] - below[x];
        let sx = SMOOTH[0] * dx_above + SMOOTH[1] * dx_row + SMOOTH[2] * dx_below;

        let dy_left = below[x] - above[x];
        let dy_mid = below[x + 1] - above[x + 1];
        let dy_right = below[x + 2] - above[x + 2];
        let sy = SMOOTH[0] * dy_left + SMOOTH[1] * dy_mid + SMOOTH[2] * dy_right;

        gx[x] = sx;
        gy[x] = sy;
        mag[x] = (sx * sx + sy * sy).sqrt();
    }
}

/// Scores points `start..` of a pose, continuing from a partial `sum`.
///
/// Returns `None` when the early-exit check fires.
pub(crate) fn score_tail(
    field: &GradientField,
    center: usize,
    pose: PoseOffsets<'_>,
    params: &ScoreParams,
    start: usize,
    mut sum: f32,
    checkpoint: usize,
) -> Option<f32> {
    let gx = field.gx();
    let gy = field.gy();
    let mag = field.mag();
    let floor = params.exit_floor();

    for i in start..pose.len() {
        let idx = (center as isize + pose.offsets[i]) as usize;
        let m = mag[idx];
        if m > MIN_MAGNITUDE {
            let mut c = (pose.dir_x[i] * gx[idx] + pose.dir_y[i] * gy[idx]) * (1.0 / m);
            if params.contrast_invariant {
                c = c.abs();
            }
            sum += c;
        }
        let done = i + 1;
        if done == checkpoint && sum / (done as f32) < floor {
            return None;
        }
    }
    Some(sum)
}

pub(crate) fn score_pose_scalar(
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
    match score_tail(field, center, pose, &params, 0, 0.0, checkpoint) {
        Some(sum) => sum / n as f32,
        None => 0.0,
    }
}

/// Portable vote accumulation shared by every kernel.
pub(crate) fn accumulate_votes(plan: &VotePlan<'_>, acc: &mut [u32]) {
    let grid = plan.grid;
    debug_assert_eq!(acc.len(), grid.len());
    let flips = [0isize, HALF_TURN];
    let flips = if plan.contrast_invariant {
        &flips[..]
    } else {
        &flips[..1]
    };

    for edge in plan.edges {
        let base = direction_bin(edge.dir_deg - plan.angle_deg);
        let ex = edge.x as f32;
        let ey = edge.y as f32;
        for &flip in flips {
            for delta in -1..=1isize {
                let bin = bin_offset(base, flip + delta);
                for &point in plan.index.bucket(bin) {
                    let cx = (ex - plan.offset_x[point]).round();
                    let cy = (ey - plan.offset_y[point]).round();
                    if cx < 0.0 || cy < 0.0 {
                        continue;
                    }
                    let col = (cx as usize) >> grid.shift;
                    let row = (cy as usize) >> grid.shift;
                    if col < grid.cols && row < grid.rows {
                        acc[row * grid.cols + col] += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{accumulate_votes, score_pose_scalar};
    use crate::edges::EdgePixel;
    use crate::gradient::GradientField;
    use crate::kernel::{CellGrid, PoseOffsets, ScoreParams, VotePlan};
    use crate::model::{DirectionIndex, EdgePoint};

    fn uniform_field(width: usize, height: usize, gx: f32, gy: f32) -> GradientField {
        let n = width * height;
        let mag = (gx * gx + gy * gy).sqrt();
        GradientField::from_parts(width, height, vec![gx; n], vec![gy; n], vec![mag; n]).unwrap()
    }

    #[test]
    fn aligned_directions_score_one() {
        let field = uniform_field(8, 8, 3.0, 4.0);
        let offsets = [0isize, 1, 8, 9];
        let dir_x = [0.6f32; 4];
        let dir_y = [0.8f32; 4];
        let pose = PoseOffsets {
            offsets: &offsets,
            dir_x: &dir_x,
            dir_y: &dir_y,
        };
        let params = ScoreParams {
            min_score: 0.5,
            greediness: 0.0,
            contrast_invariant: false,
            early_exit: true,
        };
        let score = score_pose_scalar(&field, 0, pose, params);
        assert!((score - 1.0).abs() < 1e-6);

        let flipped = [-0.6f32; 4];
        let flipped_y = [-0.8f32; 4];
        let pose = PoseOffsets {
            offsets: &offsets,
            dir_x: &flipped,
            dir_y: &flipped_y,
        };
        let strict = score_pose_scalar(&field, 0, pose, params.exhaustive());
        assert!((strict + 1.0).abs() < 1e-6);
        let invariant = ScoreParams {
            contrast_invariant: true,
            ..params
        };
        let score = score_pose_scalar(&field, 0, pose, invariant);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn early_exit_abandons_bad_prefix() {
        let field = uniform_field(64, 1, 1.0, 0.0);
        let offsets: Vec<isize> = (0..40).collect();
        // first 8 points point the wrong way, the remaining 32 agree
        let dir_x: Vec<f32> = (0..40).map(|i| if i < 8 { -1.0 } else { 1.0 }).collect();
        let dir_y = vec![0.0f32; 40];
        let pose = PoseOffsets {
            offsets: &offsets,
            dir_x: &dir_x,
            dir_y: &dir_y,
        };
        let params = ScoreParams {
            min_score: 0.5,
            greediness: 0.2,
            contrast_invariant: false,
            early_exit: true,
        };
        assert_eq!(score_pose_scalar(&field, 0, pose, params), 0.0);
        let full = score_pose_scalar(&field, 0, pose, params.exhaustive());
        assert!((full - 0.6).abs() < 1e-6);
    }

    #[test]
    fn near_zero_magnitude_is_skipped() {
        let field = uniform_field(4, 4, 0.0, 0.0);
        let offsets = [0isize; 10];
        let dirs = [1.0f32; 10];
        let pose = PoseOffsets {
            offsets: &offsets,
            dir_x: &dirs,
            dir_y: &dirs,
        };
        let params = ScoreParams {
            min_score: 0.0,
            greediness: 0.0,
            contrast_invariant: false,
            early_exit: false,
        };
        assert_eq!(score_pose_scalar(&field, 5, pose, params), 0.0);
    }

    #[test]
    fn votes_left_of_the_image_are_dropped() {
        let points = [EdgePoint {
            x: 0.5,
            y: 0.0,
            dx: 1.0,
            dy: 0.0,
            magnitude: 1.0,
            curvature: 0.0,
        }];
        let index = DirectionIndex::build(&points);
        let edges = [
            EdgePixel {
                x: 0,
                y: 3,
                dir_deg: 0.0,
            },
            EdgePixel {
                x: 2,
                y: 3,
                dir_deg: 0.0,
            },
        ];
        let grid = CellGrid::covering(8, 8, 1);
        let plan = VotePlan {
            edges: &edges,
            index: &index,
            offset_x: &[0.5],
            offset_y: &[0.0],
            angle_deg: 0.0,
            contrast_invariant: false,
            grid,
        };
        let mut acc = vec![0u32; grid.len()];
        accumulate_votes(&plan, &mut acc);
        // center -0.5 rounds to -1 and must not land in column 0
        assert_eq!(acc.iter().sum::<u32>(), 1);
        assert_eq!(acc[grid.cols + 1], 1);
        assert_eq!(acc[grid.cols], 0);
    }
}
