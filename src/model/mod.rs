//! Trained edge models.
//!
//! A [`Model`] is a compact list of oriented edge samples taken from a
//! template, indexed by gradient direction for voting, plus a pose arena
//! reused by every refinement of that model.

mod arena;
mod train;

pub use arena::{PoseArena, PoseExtent};
pub use train::train_model;

use crate::edges::EdgeThresholds;
use crate::image::OwnedImage;
use crate::util::math::{direction_bin, direction_deg, DIRECTION_BINS};
use crate::util::{ShapeMatchError, ShapeMatchResult};

/// A model needs at least this many edge points to be usable.
pub const MIN_TRAINED_POINTS: usize = 10;

/// One oriented edge sample of a trained model.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgePoint {
    /// Offset from the model center, x.
    pub x: f32,
    /// Offset from the model center, y.
    pub y: f32,
    /// Unit gradient direction, x.
    pub dx: f32,
    /// Unit gradient direction, y.
    pub dy: f32,
    /// Raw gradient magnitude.
    pub magnitude: f32,
    /// Normalized corner response in [0, 1].
    pub curvature: f32,
}

impl EdgePoint {
    /// Gradient direction in degrees within [0, 360).
    pub fn direction_deg(&self) -> f32 {
        direction_deg(self.dx, self.dy)
    }
}

/// Point indices bucketed by 10-degree gradient direction.
///
/// Every point belongs to exactly one bucket and buckets list indices in
/// increasing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionIndex {
    buckets: Vec<Vec<usize>>,
}

impl DirectionIndex {
    pub fn build(points: &[EdgePoint]) -> Self {
        let mut buckets = vec![Vec::new(); DIRECTION_BINS];
        for (i, p) in points.iter().enumerate() {
            buckets[direction_bin(p.direction_deg())].push(i);
        }
        Self { buckets }
    }

    /// Indices of points whose direction falls in `bin`.
    pub fn bucket(&self, bin: usize) -> &[usize] {
        self.buckets.get(bin).map_or(&[], Vec::as_slice)
    }

    /// Total number of indexed points.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trained shape model.
#[derive(Clone, Debug)]
pub struct Model {
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) template: OwnedImage,
    pub(crate) center: (f32, f32),
    pub(crate) points: Vec<EdgePoint>,
    pub(crate) index: DirectionIndex,
    pub(crate) thresholds: EdgeThresholds,
    pub(crate) arena: PoseArena,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// A model is trained once it holds enough points to match.
    pub fn is_trained(&self) -> bool {
        self.points.len() >= MIN_TRAINED_POINTS
    }

    /// Grayscale template the model was trained from.
    pub fn template(&self) -> &OwnedImage {
        &self.template
    }

    /// Template dimensions `(width, height)`.
    pub fn template_size(&self) -> (usize, usize) {
        (self.template.width(), self.template.height())
    }

    /// Model center in the coordinates of the image the template was cut from.
    pub fn trained_center(&self) -> (f32, f32) {
        self.center
    }

    /// Center of the template in its own pixel grid.
    pub fn local_center(&self) -> (f32, f32) {
        local_center(self.template.width(), self.template.height())
    }

    pub fn points(&self) -> &[EdgePoint] {
        &self.points
    }

    pub fn direction_index(&self) -> &DirectionIndex {
        &self.index
    }

    /// Hysteresis thresholds used at training time; voting reuses them.
    pub fn thresholds(&self) -> EdgeThresholds {
        self.thresholds
    }

    pub fn arena(&self) -> &PoseArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut PoseArena {
        &mut self.arena
    }

    /// Exports the serializable state of the model.
    pub fn to_parts(&self) -> ModelParts {
        ModelParts {
            name: self.name.clone(),
            enabled: self.enabled,
            template_width: self.template.width(),
            template_height: self.template.height(),
            template: self.template.data().to_vec(),
            center: self.center,
            thresholds: self.thresholds,
            points: self.points.clone(),
        }
    }

    /// Rebuilds a model from exported state.
    ///
    /// The direction index is rebuilt and the arena starts empty; it is
    /// sized on first use.
    pub fn from_parts(parts: ModelParts) -> ShapeMatchResult<Self> {
        if parts.points.len() < MIN_TRAINED_POINTS {
            return Err(ShapeMatchError::DegenerateTrainingInput {
                points: parts.points.len(),
                required: MIN_TRAINED_POINTS,
            });
        }
        let unit = parts.points.iter().all(|p| {
            let norm = (p.dx * p.dx + p.dy * p.dy).sqrt();
            p.x.is_finite() && p.y.is_finite() && (norm - 1.0).abs() < 1e-3
        });
        if !unit {
            return Err(ShapeMatchError::InvalidInput(
                "edge point directions must be finite unit vectors",
            ));
        }
        let template =
            OwnedImage::new(parts.template, parts.template_width, parts.template_height)?;
        let index = DirectionIndex::build(&parts.points);
        Ok(Self {
            name: parts.name,
            enabled: parts.enabled,
            template,
            center: parts.center,
            points: parts.points,
            index,
            thresholds: parts.thresholds,
            arena: PoseArena::default(),
        })
    }
}

/// Plain-data view of a [`Model`] for external serializers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelParts {
    pub name: String,
    pub enabled: bool,
    pub template_width: usize,
    pub template_height: usize,
    /// Grayscale template bytes, row-major and contiguous.
    pub template: Vec<u8>,
    pub center: (f32, f32),
    pub thresholds: EdgeThresholds,
    pub points: Vec<EdgePoint>,
}

pub(crate) fn local_center(width: usize, height: usize) -> (f32, f32) {
    ((width / 2) as f32, (height / 2) as f32)
}
