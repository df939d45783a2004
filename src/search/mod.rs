//! Search parameters, poses and match results.
//!
//! `hough` finds a rough pose per model, `refine` polishes it on the pose
//! lattice and `matcher` runs both over every enabled model.

pub(crate) mod hough;
pub(crate) mod matcher;
pub(crate) mod refine;

use crate::edges::EdgeThresholds;
use crate::kernel::ScoreParams;
use crate::overlay::Overlay;
use crate::util::math::sin_cos_deg;
use crate::util::{ShapeMatchError, ShapeMatchResult};

pub use hough::HoughPeak;
pub use matcher::ShapeMatcher;

/// Deepest voting level; at 8x downsampling the voted angle can drift past
/// the refinement window.
pub const MAX_PYRAMID_LEVELS: usize = 3;

/// Smallest coarse voting step in degrees.
pub const MIN_COARSE_STEP_DEG: f32 = 4.0;

/// Smallest fine voting step in degrees.
pub const MIN_FINE_STEP_DEG: f32 = 1.0;

/// Training and matching parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchParams {
    /// Hysteresis low threshold on gradient magnitude.
    pub low_threshold: f32,
    /// Hysteresis high threshold on gradient magnitude.
    pub high_threshold: f32,
    /// First angle of the search range in degrees.
    pub angle_start: f32,
    /// Width of the search range in degrees (360 = full turn).
    pub angle_extent: f32,
    /// Fine angle resolution in degrees.
    pub angle_step: f32,
    /// Total scale span centered on 1.0 (0.2 searches 0.9..=1.1).
    pub scale_range: f32,
    /// Scale lattice resolution.
    pub scale_step: f32,
    /// Acceptance threshold on the final score.
    pub min_score: f32,
    /// Pyramid levels used for voting (1 = full resolution, at most 3).
    pub pyramid_levels: usize,
    /// Early-exit tolerance in [0, 1].
    pub greediness: f32,
    /// Cap on trained edge points.
    pub max_points: usize,
    /// Score `|cos|` so inverted contrast matches too.
    pub contrast_invariant: bool,
    /// Weight of the curvature score when sampling points, in [0, 1].
    pub curvature_weight: f32,
    /// Derive hysteresis thresholds from the template.
    pub auto_tune: bool,
    /// Vote candidate angles in parallel (needs the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 150.0,
            angle_start: -180.0,
            angle_extent: 360.0,
            angle_step: 1.0,
            scale_range: 0.2,
            scale_step: 0.05,
            min_score: 0.5,
            pyramid_levels: 1,
            greediness: 0.7,
            max_points: 500,
            contrast_invariant: false,
            curvature_weight: 0.3,
            auto_tune: false,
            parallel: true,
        }
    }
}

impl MatchParams {
    /// Checks ranges and relationships between fields.
    pub fn validate(&self) -> ShapeMatchResult<()> {
        let finite = [
            self.low_threshold,
            self.high_threshold,
            self.angle_start,
            self.angle_extent,
            self.angle_step,
            self.scale_range,
            self.scale_step,
            self.min_score,
            self.greediness,
            self.curvature_weight,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ShapeMatchError::InvalidInput("parameters must be finite"));
        }
        if self.low_threshold < 0.0 || self.high_threshold < self.low_threshold {
            return Err(ShapeMatchError::InvalidInput(
                "thresholds must satisfy 0 <= low <= high",
            ));
        }
        if self.angle_step <= 0.0 {
            return Err(ShapeMatchError::InvalidInput("angle_step must be > 0"));
        }
        if self.angle_extent < 0.0 {
            return Err(ShapeMatchError::InvalidInput("angle_extent must be >= 0"));
        }
        if self.scale_range < 0.0 || self.scale_range >= 2.0 {
            return Err(ShapeMatchError::InvalidInput("scale_range must be in [0, 2)"));
        }
        if self.scale_step < 0.0 || (self.scale_range > 0.0 && self.scale_step == 0.0) {
            return Err(ShapeMatchError::InvalidInput(
                "scale_step must be > 0 when scale_range > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.greediness) {
            return Err(ShapeMatchError::InvalidInput("greediness must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.curvature_weight) {
            return Err(ShapeMatchError::InvalidInput(
                "curvature_weight must be in [0, 1]",
            ));
        }
        if self.pyramid_levels == 0 || self.pyramid_levels > MAX_PYRAMID_LEVELS {
            return Err(ShapeMatchError::InvalidInput("pyramid_levels must be in 1..=3"));
        }
        if self.max_points < crate::model::MIN_TRAINED_POINTS {
            return Err(ShapeMatchError::InvalidInput("max_points must be >= 10"));
        }
        Ok(())
    }

    /// Configured hysteresis pair.
    pub fn thresholds(&self) -> EdgeThresholds {
        EdgeThresholds::new(self.low_threshold, self.high_threshold)
    }

    /// Coarse voting step: `max(angle_step, 4)`.
    pub fn coarse_step(&self) -> f32 {
        self.angle_step.max(MIN_COARSE_STEP_DEG)
    }

    /// Fine voting step: `max(angle_step, 1)`.
    pub fn fine_step(&self) -> f32 {
        self.angle_step.max(MIN_FINE_STEP_DEG)
    }

    /// Scale samples on each side of 1.0.
    pub(crate) fn scale_half_count(&self) -> usize {
        if self.scale_range <= 0.0 || self.scale_step <= 0.0 {
            return 0;
        }
        ((0.5 * self.scale_range / self.scale_step) + 1e-4).floor() as usize
    }

    /// Number of scale samples in the refinement lattice, always odd so 1.0
    /// is sampled.
    pub fn scale_count(&self) -> usize {
        2 * self.scale_half_count() + 1
    }

    /// Angle samples on each side of the lattice center.
    pub(crate) fn angle_half_count(&self) -> usize {
        ((self.coarse_step() / self.angle_step) + 1e-4).floor() as usize
    }

    /// `(angles, scales)` of the refinement lattice.
    pub fn lattice_shape(&self) -> (usize, usize) {
        (2 * self.angle_half_count() + 1, self.scale_count())
    }

    /// Arena slots needed for one refinement: the lattice plus a spare slot
    /// for sub-step neighbours that fall outside it.
    pub fn arena_poses(&self) -> usize {
        let (angles, scales) = self.lattice_shape();
        angles * scales + 1
    }

    pub(crate) fn score_params(&self) -> ScoreParams {
        ScoreParams {
            min_score: self.min_score,
            greediness: self.greediness,
            contrast_invariant: self.contrast_invariant,
            early_exit: true,
        }
    }
}

/// Rigid-plus-scale placement of a model in the search image.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Model center, x.
    pub x: f32,
    /// Model center, y.
    pub y: f32,
    /// Rotation in degrees, wrapped to [-180, 180).
    pub angle_deg: f32,
    /// Uniform scale around 1.0.
    pub scale: f32,
    /// Mean gradient agreement in [-1, 1] (or [0, 1] when contrast invariant).
    pub score: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            angle_deg: 0.0,
            scale: 1.0,
            score: 0.0,
        }
    }
}

impl Pose {
    /// Maps a model-relative offset into image coordinates.
    pub fn transform(&self, dx: f32, dy: f32) -> (f32, f32) {
        let (sin_a, cos_a) = sin_cos_deg(self.angle_deg);
        let rx = self.scale * (cos_a * dx - sin_a * dy);
        let ry = self.scale * (sin_a * dx + cos_a * dy);
        (self.x + rx, self.y + ry)
    }
}

/// Identity of the winning model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedModel {
    /// Registration index inside the matcher.
    pub index: usize,
    pub name: String,
}

/// Per-model outcome kept for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelScore {
    pub index: usize,
    pub name: String,
    /// Refined pose, `None` when voting found nothing.
    pub pose: Option<Pose>,
}

impl ModelScore {
    /// Score of the refined pose, 0 when none was found.
    pub fn score(&self) -> f32 {
        self.pose.map_or(0.0, |p| p.score)
    }
}

/// Outcome of one matching call.
///
/// Failures are values: `success == false` with `error` set. On
/// `NoMatchFound` the closest pose is still reported in `pose`.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub success: bool,
    pub model: Option<MatchedModel>,
    pub pose: Pose,
    pub overlay: Overlay,
    pub error: Option<ShapeMatchError>,
    pub model_scores: Vec<ModelScore>,
}

impl MatchResult {
    pub(crate) fn failure(error: ShapeMatchError, overlay: Overlay) -> Self {
        Self {
            success: false,
            model: None,
            pose: Pose::default(),
            overlay,
            error: Some(error),
            model_scores: Vec::new(),
        }
    }

    /// Human-readable failure reason.
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Score of the reported pose.
    pub fn score(&self) -> f32 {
        self.pose.score
    }
}
