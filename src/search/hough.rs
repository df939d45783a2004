//! Generalized Hough voting over candidate rotations.
//!
//! Each candidate angle gets its own accumulator and reports its strongest
//! cell; results meet only in the ordered top-K merge, so sequential and
//! parallel runs agree exactly.

use crate::candidate::topk::{TopK, VotePeak};
use crate::edges::{edge_pixels, hysteresis_edges, EdgePixel};
use crate::gradient::GradientField;
use crate::kernel::{CellGrid, Kernel, VotePlan};
use crate::model::Model;
use crate::search::MatchParams;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{sin_cos_deg, wrap_deg};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Accumulator cells are `2^CELL_SHIFT` pixels wide.
pub(crate) const CELL_SHIFT: u32 = 1;

/// Coarse candidates carried into the fine pass.
pub(crate) const COARSE_CANDIDATES: usize = 5;

const ANGLE_EPS: f32 = 1e-3;

/// Best voting result for one model, in full-resolution search coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoughPeak {
    pub angle_deg: f32,
    pub x: f32,
    pub y: f32,
    pub votes: u32,
}

/// Edge pixels of the search image at voting resolution.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VoteInput<'a> {
    pub(crate) edges: &'a [EdgePixel],
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Downsampling factor between voting and full resolution.
    pub(crate) factor: usize,
}

fn full_circle(params: &MatchParams) -> bool {
    params.angle_extent >= 360.0 - ANGLE_EPS
}

/// Coarse angles spanning `[start, start + extent]`; a full turn omits the
/// duplicate end angle.
pub(crate) fn coarse_angles(params: &MatchParams) -> Vec<f32> {
    let step = params.coarse_step();
    let start = params.angle_start;
    if full_circle(params) {
        let n = ((360.0 / step) + 1e-4).floor().max(1.0) as usize;
        return (0..n).map(|i| start + i as f32 * step).collect();
    }
    let n = ((params.angle_extent / step) + 1e-4).floor() as usize + 1;
    let mut angles: Vec<f32> = (0..n).map(|i| start + i as f32 * step).collect();
    let end = start + params.angle_extent;
    if angles.last().is_some_and(|&last| end - last > ANGLE_EPS) {
        angles.push(end);
    }
    angles
}

/// Fine angles within one coarse step of `center`, limited to the range.
fn fine_angles(params: &MatchParams, center: f32, out: &mut Vec<f32>) {
    let coarse = params.coarse_step();
    let fine = params.fine_step();
    let half = ((coarse / fine) + 1e-4).floor() as i32;
    let start = params.angle_start;
    let end = start + params.angle_extent;
    for k in -half..=half {
        let angle = center + k as f32 * fine;
        if full_circle(params) {
            out.push(wrap_deg(angle));
        } else if angle >= start - ANGLE_EPS && angle <= end + ANGLE_EPS {
            out.push(angle);
        }
    }
}

/// Votes `model` at one rotation and returns its strongest cell.
fn vote_angle(
    model: &Model,
    input: &VoteInput<'_>,
    grid: CellGrid,
    angle_deg: f32,
    contrast_invariant: bool,
    kernel: &dyn Kernel,
) -> Option<(usize, usize, u32)> {
    let (sin_a, cos_a) = sin_cos_deg(angle_deg);
    let inv = 1.0 / input.factor as f32;
    let points = model.points();
    let offset_x: Vec<f32> = points
        .iter()
        .map(|p| (cos_a * p.x - sin_a * p.y) * inv)
        .collect();
    let offset_y: Vec<f32> = points
        .iter()
        .map(|p| (sin_a * p.x + cos_a * p.y) * inv)
        .collect();

    let plan = VotePlan {
        edges: input.edges,
        index: model.direction_index(),
        offset_x: &offset_x,
        offset_y: &offset_y,
        angle_deg,
        contrast_invariant,
        grid,
    };
    let mut acc = vec![0u32; grid.len()];
    kernel.vote(&plan, &mut acc);

    let mut best = 0usize;
    for (i, &v) in acc.iter().enumerate() {
        if v > acc[best] {
            best = i;
        }
    }
    let votes = acc.get(best).copied().unwrap_or(0);
    (votes > 0).then_some((best % grid.cols, best / grid.cols, votes))
}

/// Runs `vote_angle` for every angle, in parallel when enabled.
fn vote_all(
    model: &Model,
    input: &VoteInput<'_>,
    grid: CellGrid,
    angles: &[f32],
    params: &MatchParams,
    kernel: &dyn Kernel,
) -> Vec<VotePeak> {
    let task = |(order, &angle_deg): (usize, &f32)| {
        vote_angle(model, input, grid, angle_deg, params.contrast_invariant, kernel).map(
            |(col, row, votes)| VotePeak {
                order,
                angle_deg,
                col,
                row,
                votes,
            },
        )
    };

    #[cfg(feature = "rayon")]
    if params.parallel {
        return angles
            .par_iter()
            .enumerate()
            .filter_map(task)
            .collect();
    }

    angles.iter().enumerate().filter_map(task).collect()
}

/// Coarse-to-fine rotation search for one model.
///
/// Returns `None` when no edge pixel voted at any angle.
pub(crate) fn vote_model(
    model: &Model,
    input: &VoteInput<'_>,
    params: &MatchParams,
    kernel: &dyn Kernel,
) -> Option<HoughPeak> {
    let _span = trace_span!(
        "hough_vote",
        edges = input.edges.len(),
        factor = input.factor
    )
    .entered();
    if input.edges.is_empty() || model.points().is_empty() {
        return None;
    }
    let grid = CellGrid::covering(input.width, input.height, CELL_SHIFT);

    let coarse = coarse_angles(params);
    let mut topk = TopK::new(COARSE_CANDIDATES);
    for peak in vote_all(model, input, grid, &coarse, params, kernel) {
        topk.push(peak);
    }
    let candidates = topk.into_sorted_desc();
    trace_event!(
        "coarse_vote",
        angles = coarse.len(),
        candidates = candidates.len()
    );

    let mut fine = Vec::new();
    for candidate in &candidates {
        fine_angles(params, candidate.angle_deg, &mut fine);
    }
    let mut best = TopK::new(1);
    for peak in vote_all(model, input, grid, &fine, params, kernel) {
        best.push(peak);
    }
    let peak = best
        .into_sorted_desc()
        .into_iter()
        .next()
        .or_else(|| candidates.first().copied())?;

    // cell center at voting resolution, then back to full resolution
    let factor = input.factor as f32;
    let u = (peak.col << CELL_SHIFT) as f32 + 0.5;
    let v = (peak.row << CELL_SHIFT) as f32 + 0.5;
    let result = HoughPeak {
        angle_deg: peak.angle_deg,
        x: (u + 0.5) * factor - 0.5,
        y: (v + 0.5) * factor - 0.5,
        votes: peak.votes,
    };
    trace_event!(
        "fine_vote",
        angle = result.angle_deg,
        x = result.x,
        y = result.y,
        votes = result.votes
    );
    Some(result)
}

/// Votes `model` over a full-resolution gradient field, using the model's
/// own hysteresis thresholds.
pub fn hough_peak(
    model: &Model,
    field: &GradientField,
    params: &MatchParams,
    kernel: &dyn Kernel,
) -> Option<HoughPeak> {
    let mask = hysteresis_edges(field, model.thresholds());
    let edges = edge_pixels(field, &mask);
    let input = VoteInput {
        edges: &edges,
        width: field.width(),
        height: field.height(),
        factor: 1,
    };
    vote_model(model, &input, params, kernel)
}

#[cfg(test)]
mod tests {
    use super::{coarse_angles, fine_angles};
    use crate::search::MatchParams;

    #[test]
    fn coarse_grid_covers_range() {
        let params = MatchParams {
            angle_start: -45.0,
            angle_extent: 90.0,
            ..MatchParams::default()
        };
        let angles = coarse_angles(&params);
        // -45, -41, ..., 43 plus the range end
        assert_eq!(angles.len(), 24);
        assert_eq!(angles[0], -45.0);
        assert!((angles[22] - 43.0).abs() < 1e-4);
        assert!((angles[23] - 45.0).abs() < 1e-4);

        let params = MatchParams {
            angle_start: -45.0,
            angle_extent: 90.0,
            angle_step: 5.0,
            ..MatchParams::default()
        };
        let angles = coarse_angles(&params);
        assert_eq!(angles.len(), 19);
        assert!((angles[18] - 45.0).abs() < 1e-4);
    }

    #[test]
    fn full_turn_has_no_duplicate() {
        let angles = coarse_angles(&MatchParams::default());
        assert_eq!(angles.len(), 90);
        assert_eq!(angles[0], -180.0);
    }

    #[test]
    fn fine_grid_stays_inside_range() {
        let params = MatchParams {
            angle_start: 0.0,
            angle_extent: 10.0,
            ..MatchParams::default()
        };
        let mut out = Vec::new();
        fine_angles(&params, 2.0, &mut out);
        assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = Vec::new();
        fine_angles(&MatchParams::default(), 178.0, &mut out);
        assert_eq!(out.len(), 9);
        assert!(out.iter().all(|a| (-180.0..180.0).contains(a)));
    }
}
