//! Edge model training.

use crate::edges::{harris_response, hysteresis_edges, EdgeThresholds};
use crate::gradient::GradientField;
use crate::image::PixelBuffer;
use crate::kernel::{Kernel, MIN_MAGNITUDE};
use crate::model::{local_center, DirectionIndex, EdgePoint, Model, PoseArena, MIN_TRAINED_POINTS};
use crate::search::MatchParams;
use crate::trace::{trace_event, trace_span};
use crate::util::{ShapeMatchError, ShapeMatchResult};

/// Trains a model from a template cut at `origin` of a larger image.
///
/// Multi-channel templates are converted to grayscale. Fails with
/// `DegenerateTrainingInput` when fewer than 10 edge points survive.
pub fn train_model(
    name: &str,
    template: PixelBuffer<'_>,
    origin: (usize, usize),
    params: &MatchParams,
    kernel: &dyn Kernel,
) -> ShapeMatchResult<Model> {
    params.validate()?;
    let gray = template.to_gray()?;
    let width = gray.width();
    let height = gray.height();
    let _span = trace_span!("train_model", width = width, height = height).entered();

    let field = GradientField::build(gray.view(), kernel)?;
    let thresholds = if params.auto_tune {
        EdgeThresholds::auto(&field)
    } else {
        params.thresholds()
    };
    let mask = hysteresis_edges(&field, thresholds);
    let curvature = harris_response(&field);

    let (cx, cy) = local_center(width, height);
    let gx = field.gx();
    let gy = field.gy();
    let mag = field.mag();
    let raw: Vec<EdgePoint> = mask
        .iter_set()
        .filter(|&idx| mag[idx] > MIN_MAGNITUDE)
        .map(|idx| {
            let m = mag[idx];
            EdgePoint {
                x: (idx % width) as f32 - cx,
                y: (idx / width) as f32 - cy,
                dx: gx[idx] / m,
                dy: gy[idx] / m,
                magnitude: m,
                curvature: curvature[idx],
            }
        })
        .collect();
    let raw_count = raw.len();

    let points = if raw.len() > params.max_points {
        sample_points(raw, (width, height), params.max_points, params.curvature_weight)
    } else {
        raw
    };
    trace_event!(
        "edge_points",
        raw = raw_count,
        kept = points.len(),
        low = thresholds.low,
        high = thresholds.high
    );

    if points.len() < MIN_TRAINED_POINTS {
        return Err(ShapeMatchError::DegenerateTrainingInput {
            points: points.len(),
            required: MIN_TRAINED_POINTS,
        });
    }

    let index = DirectionIndex::build(&points);
    let mut arena = PoseArena::default();
    arena.ensure_capacity(params.arena_poses(), points.len());

    Ok(Model {
        name: name.to_string(),
        enabled: true,
        template: gray,
        center: (origin.0 as f32 + cx, origin.1 as f32 + cy),
        points,
        index,
        thresholds,
        arena,
    })
}

/// Reduces `points` to `cap` entries with even spatial coverage.
///
/// The template is split into a near-square grid of about `cap` cells.
/// Each cell ranks its points by a blend of normalized magnitude and
/// curvature, then cells hand out their best remaining point in turn until
/// the cap is reached. The result keeps raster order.
fn sample_points(
    points: Vec<EdgePoint>,
    size: (usize, usize),
    cap: usize,
    curvature_weight: f32,
) -> Vec<EdgePoint> {
    let (width, height) = size;
    let cols = ((cap as f32 * width as f32 / height as f32).sqrt().ceil() as usize).max(1);
    let rows = cap.div_ceil(cols).max(1);
    let (cx, cy) = local_center(width, height);

    let max_mag = points.iter().map(|p| p.magnitude).fold(0.0f32, f32::max);
    let inv_mag = if max_mag > 0.0 { 1.0 / max_mag } else { 0.0 };
    let rank = |p: &EdgePoint| {
        (1.0 - curvature_weight) * p.magnitude * inv_mag + curvature_weight * p.curvature
    };

    let mut cells: Vec<Vec<(usize, f32)>> = vec![Vec::new(); cols * rows];
    for (i, p) in points.iter().enumerate() {
        let px = (p.x + cx) as usize;
        let py = (p.y + cy) as usize;
        let col = (px * cols / width).min(cols - 1);
        let row = (py * rows / height).min(rows - 1);
        cells[row * cols + col].push((i, rank(p)));
    }
    for cell in cells.iter_mut() {
        // stable: equal ranks keep raster order
        cell.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    let mut chosen = Vec::with_capacity(cap);
    let deepest = cells.iter().map(Vec::len).max().unwrap_or(0);
    'rounds: for round in 0..deepest {
        for cell in &cells {
            if let Some(&(i, _)) = cell.get(round) {
                chosen.push(i);
                if chosen.len() == cap {
                    break 'rounds;
                }
            }
        }
    }
    chosen.sort_unstable();
    chosen.into_iter().map(|i| points[i]).collect()
}
