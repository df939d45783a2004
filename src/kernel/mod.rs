//! Acceleration strategy for the hot loops.
//!
//! A [`Kernel`] provides the three primitives the matcher spends its time in:
//! a gradient row filter, batch pose scoring and Hough vote accumulation. The
//! portable [`scalar::ScalarKernel`] is always available; the vectorized
//! `simd::SimdKernel` exists behind the `simd` feature. [`Backend::detect`]
//! probes the CPU once and never fails: it falls back to the portable kernel
//! when vector units or the feature are missing.

use crate::edges::EdgePixel;
use crate::gradient::GradientField;
use crate::model::DirectionIndex;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

/// Image gradient magnitudes at or below this value are ignored when scoring.
pub const MIN_MAGNITUDE: f32 = 1e-3;

/// Fraction of model points scored before the early-exit check.
pub const EARLY_EXIT_FRACTION: f32 = 0.2;

/// Batch width of the scoring kernels.
pub const LANES: usize = 8;

/// Knobs for a single pose evaluation.
#[derive(Clone, Copy, Debug)]
pub struct ScoreParams {
    /// Final acceptance threshold; scales the early-exit floor.
    pub min_score: f32,
    /// In [0, 1]; the early-exit floor is `min_score * (1 - greediness)`.
    pub greediness: f32,
    /// Take `|cos|` per point so either polarity scores.
    pub contrast_invariant: bool,
    /// Enables the early-exit check.
    pub early_exit: bool,
}

impl ScoreParams {
    /// Running-average floor below which an evaluation is abandoned.
    pub fn exit_floor(&self) -> f32 {
        self.min_score * (1.0 - self.greediness)
    }

    /// Same parameters with early exit disabled.
    pub fn exhaustive(self) -> Self {
        Self {
            early_exit: false,
            ..self
        }
    }
}

/// Number of points after which the early-exit check runs, or `usize::MAX`.
///
/// The value is rounded up to a multiple of [`LANES`] (or to `n`) so scalar
/// and vectorized kernels check at the same point.
pub fn early_exit_checkpoint(n: usize, params: &ScoreParams) -> usize {
    if !params.early_exit || n == 0 {
        return usize::MAX;
    }
    let raw = ((n as f32) * EARLY_EXIT_FRACTION).ceil() as usize;
    let rounded = raw.div_ceil(LANES) * LANES;
    rounded.clamp(1, n)
}

/// One pose of the refinement lattice as seen by a kernel.
///
/// `offsets[i]` is the linear index delta of point `i` relative to the pose
/// center in the gradient field; `dir_x`/`dir_y` are its rotated unit
/// direction. All three slices have equal length.
#[derive(Clone, Copy, Debug)]
pub struct PoseOffsets<'a> {
    pub offsets: &'a [isize],
    pub dir_x: &'a [f32],
    pub dir_y: &'a [f32],
}

impl PoseOffsets<'_> {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Accumulator geometry: `cols x rows` cells of `2^shift` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellGrid {
    pub cols: usize,
    pub rows: usize,
    pub shift: u32,
}

impl CellGrid {
    /// Covers a `width x height` image with `2^shift` pixel cells.
    pub fn covering(width: usize, height: usize, shift: u32) -> Self {
        Self {
            cols: (width >> shift) + 1,
            rows: (height >> shift) + 1,
            shift,
        }
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inputs for voting one candidate rotation.
///
/// `offset_x`/`offset_y` hold every model point's offset rotated by
/// `angle_deg` and expressed at voting resolution, indexed like the model's
/// point list.
#[derive(Clone, Copy, Debug)]
pub struct VotePlan<'a> {
    pub edges: &'a [EdgePixel],
    pub index: &'a DirectionIndex,
    pub offset_x: &'a [f32],
    pub offset_y: &'a [f32],
    pub angle_deg: f32,
    pub contrast_invariant: bool,
    pub grid: CellGrid,
}

/// Strategy interface for the matcher's inner loops.
pub trait Kernel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Filters one row. `rows` are the previous, current and next rows padded
    /// by one replicated pixel on each side (`width + 2` samples); outputs
    /// have `width` samples.
    fn gradient_row(&self, rows: [&[f32]; 3], gx: &mut [f32], gy: &mut [f32], mag: &mut [f32]);

    /// Scores one pose centered at linear index `center` of `field`.
    ///
    /// The caller guarantees every `center + offset` is inside the field.
    fn score_pose(
        &self,
        field: &GradientField,
        center: usize,
        pose: PoseOffsets<'_>,
        params: ScoreParams,
    ) -> f32;

    /// Accumulates votes for one candidate rotation into `acc`
    /// (`plan.grid.len()` cells).
    fn vote(&self, plan: &VotePlan<'_>, acc: &mut [u32]) {
        scalar::accumulate_votes(plan, acc);
    }
}

/// Kernel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Scalar reference implementation.
    Portable,
    /// `f32x8` implementation; resolves to `Portable` when unavailable.
    Vectorized,
}

static PORTABLE: scalar::ScalarKernel = scalar::ScalarKernel;

#[cfg(feature = "simd")]
static VECTORIZED: simd::SimdKernel = simd::SimdKernel;

impl Backend {
    /// Picks the vectorized kernel when it is compiled in and the CPU has a
    /// usable vector unit.
    pub fn detect() -> Self {
        if vector_unit_available() {
            Backend::Vectorized
        } else {
            Backend::Portable
        }
    }

    /// Returns the backend actually used after availability checks.
    pub fn resolve(self) -> Self {
        match self {
            Backend::Vectorized if vector_unit_available() => Backend::Vectorized,
            _ => Backend::Portable,
        }
    }

    /// Returns the kernel implementing this backend.
    pub fn kernel(self) -> &'static dyn Kernel {
        match self.resolve() {
            #[cfg(feature = "simd")]
            Backend::Vectorized => &VECTORIZED,
            _ => &PORTABLE,
        }
    }
}

#[cfg(feature = "simd")]
fn vector_unit_available() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        std::is_x86_feature_detected!("sse2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        std::arch::is_aarch64_feature_detected!("neon")
    }
    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    {
        true
    }
    #[cfg(not(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "aarch64",
        all(target_arch = "wasm32", target_feature = "simd128")
    )))]
    {
        false
    }
}

#[cfg(not(feature = "simd"))]
fn vector_unit_available() -> bool {
    false
}
