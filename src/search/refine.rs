//! Dense pose-lattice refinement around a Hough peak.
//!
//! Poses are laid out angle-major in the model's arena: slot
//! `a * scales + s` holds angle sample `a` and scale sample `s`. The slot
//! after the lattice is scratch space for sub-step neighbours that fall
//! outside it.

use crate::gradient::GradientField;
use crate::kernel::{Kernel, ScoreParams};
use crate::model::{EdgePoint, Model, PoseArena};
use crate::refine::quad1d::quad_peak_offset_1d;
use crate::search::{HoughPeak, MatchParams, Pose};
use crate::trace::{trace_event, trace_span};
use crate::util::math::wrap_deg;
use crate::util::ShapeMatchResult;

/// Smallest translation search radius in pixels.
pub(crate) const MIN_SEARCH_RADIUS: usize = 4;

/// Translation search radius for a peak voted at `factor`x downsampling.
pub(crate) fn search_radius(factor: usize) -> usize {
    MIN_SEARCH_RADIUS.max(2 * factor + 2)
}

#[derive(Clone, Copy, Debug)]
struct Lattice {
    center_angle: f32,
    angle_step: f32,
    angle_half: isize,
    scale_step: f32,
    scale_half: isize,
}

impl Lattice {
    fn new(peak: &HoughPeak, params: &MatchParams) -> Self {
        Self {
            center_angle: peak.angle_deg,
            angle_step: params.angle_step,
            angle_half: params.angle_half_count() as isize,
            scale_step: params.scale_step,
            scale_half: params.scale_half_count() as isize,
        }
    }

    fn angles(&self) -> usize {
        (2 * self.angle_half + 1) as usize
    }

    fn scales(&self) -> usize {
        (2 * self.scale_half + 1) as usize
    }

    fn len(&self) -> usize {
        self.angles() * self.scales()
    }

    /// Pose for lattice coordinates relative to the center sample.
    fn angle_at(&self, a: isize) -> f32 {
        self.center_angle + a as f32 * self.angle_step
    }

    fn scale_at(&self, s: isize) -> f32 {
        1.0 + s as f32 * self.scale_step
    }

    /// Arena slot for relative lattice coordinates, if inside the lattice.
    fn slot(&self, a: isize, s: isize) -> Option<usize> {
        if a.abs() > self.angle_half || s.abs() > self.scale_half {
            return None;
        }
        let ai = (a + self.angle_half) as usize;
        let si = (s + self.scale_half) as usize;
        Some(ai * self.scales() + si)
    }

    fn coords(&self, slot: usize) -> (isize, isize) {
        let ai = (slot / self.scales()) as isize;
        let si = (slot % self.scales()) as isize;
        (ai - self.angle_half, si - self.scale_half)
    }
}

#[derive(Clone, Copy, Debug)]
struct Best {
    slot: usize,
    x: isize,
    y: isize,
    score: f32,
}

/// Scores the pose in `slot` centered at `(x, y)`, or `None` when any
/// point would fall outside the field.
fn score_at(
    field: &GradientField,
    arena: &PoseArena,
    slot: usize,
    x: isize,
    y: isize,
    params: ScoreParams,
    kernel: &dyn Kernel,
) -> Option<f32> {
    let (w, h) = (field.width(), field.height());
    let inside = x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h;
    if !inside || !arena.extent(slot).fits(x, y, w, h) {
        return None;
    }
    let center = y as usize * w + x as usize;
    Some(kernel.score_pose(field, center, arena.pose(slot), params))
}

/// Exhaustive score of a pose off the lattice, written to the scratch slot.
#[allow(clippy::too_many_arguments)]
fn score_scratch(
    field: &GradientField,
    arena: &mut PoseArena,
    points: &[EdgePoint],
    scratch: usize,
    angle_deg: f32,
    scale: f32,
    at: (isize, isize),
    params: ScoreParams,
    kernel: &dyn Kernel,
) -> ShapeMatchResult<Option<f32>> {
    if scale <= 0.0 {
        return Ok(None);
    }
    arena.write_pose(scratch, points, angle_deg, scale, field.width())?;
    Ok(score_at(field, arena, scratch, at.0, at.1, params, kernel))
}

/// Parabolic offset from three optional samples; a missing side keeps the
/// center.
fn fit(minus: Option<f32>, center: f32, plus: Option<f32>) -> f32 {
    match (minus, plus) {
        (Some(m), Some(p)) => quad_peak_offset_1d(m, center, p),
        _ => 0.0,
    }
}

/// Refines `peak` into a scored pose in field coordinates.
///
/// Returns `Ok(None)` when no lattice pose fits inside the field around the
/// peak. The reported score is the exhaustive score of the best integer
/// pose; the position, angle and scale carry the sub-step offsets.
pub(crate) fn refine_pose(
    model: &mut Model,
    field: &GradientField,
    peak: &HoughPeak,
    factor: usize,
    params: &MatchParams,
    kernel: &dyn Kernel,
) -> ShapeMatchResult<Option<Pose>> {
    let lattice = Lattice::new(peak, params);
    let radius = search_radius(factor) as isize;
    let _span = trace_span!(
        "refine_pose",
        poses = lattice.len(),
        radius = radius
    )
    .entered();

    let Model { points, arena, .. } = model;
    let points = points.as_slice();
    let scratch = lattice.len();
    arena.ensure_capacity(scratch + 1, points.len());

    let stride = field.width();
    for a in -lattice.angle_half..=lattice.angle_half {
        for s in -lattice.scale_half..=lattice.scale_half {
            if let Some(slot) = lattice.slot(a, s) {
                arena.write_pose(slot, points, lattice.angle_at(a), lattice.scale_at(s), stride)?;
            }
        }
    }

    let score_params = params.score_params();
    let cx = peak.x.round() as isize;
    let cy = peak.y.round() as isize;
    let mut best: Option<Best> = None;
    for slot in 0..lattice.len() {
        for y in cy - radius..=cy + radius {
            for x in cx - radius..=cx + radius {
                let Some(score) = score_at(field, arena, slot, x, y, score_params, kernel) else {
                    continue;
                };
                if best.is_none_or(|b| score > b.score) {
                    best = Some(Best { slot, x, y, score });
                }
            }
        }
    }
    let Some(best) = best else {
        return Ok(None);
    };

    // neighbours use full sums so the parabola sees comparable values
    let exact = score_params.exhaustive();
    let center =
        score_at(field, arena, best.slot, best.x, best.y, exact, kernel).unwrap_or(best.score);
    let x_minus = score_at(field, arena, best.slot, best.x - 1, best.y, exact, kernel);
    let x_plus = score_at(field, arena, best.slot, best.x + 1, best.y, exact, kernel);
    let y_minus = score_at(field, arena, best.slot, best.x, best.y - 1, exact, kernel);
    let y_plus = score_at(field, arena, best.slot, best.x, best.y + 1, exact, kernel);

    let (a, s) = lattice.coords(best.slot);
    let at = (best.x, best.y);
    let mut neighbour = |da: isize, ds: isize| -> ShapeMatchResult<Option<f32>> {
        match lattice.slot(a + da, s + ds) {
            Some(slot) => Ok(score_at(field, arena, slot, at.0, at.1, exact, kernel)),
            None => score_scratch(
                field,
                arena,
                points,
                scratch,
                lattice.angle_at(a + da),
                lattice.scale_at(s + ds),
                at,
                exact,
                kernel,
            ),
        }
    };
    let a_minus = neighbour(-1, 0)?;
    let a_plus = neighbour(1, 0)?;
    let (s_minus, s_plus) = if params.scale_range > 0.0 && lattice.scale_step > 0.0 {
        (neighbour(0, -1)?, neighbour(0, 1)?)
    } else {
        (None, None)
    };

    let dx = fit(x_minus, center, x_plus);
    let dy = fit(y_minus, center, y_plus);
    let da = fit(a_minus, center, a_plus);
    let ds = fit(s_minus, center, s_plus);

    let pose = Pose {
        x: best.x as f32 + dx,
        y: best.y as f32 + dy,
        angle_deg: wrap_deg(lattice.angle_at(a) + da * lattice.angle_step),
        scale: lattice.scale_at(s) + ds * lattice.scale_step,
        score: center,
    };
    trace_event!(
        "refined_pose",
        x = pose.x,
        y = pose.y,
        angle = pose.angle_deg,
        scale = pose.scale,
        score = pose.score
    );
    Ok(Some(pose))
}
