//! Low-level building blocks for custom pipelines.
//!
//! These expose the stages the [`ShapeMatcher`](crate::ShapeMatcher) chains
//! together: gradient fields, edge extraction, model training and the
//! scoring kernels. Most users should stay with the top-level API.

pub use crate::edges::{
    edge_pixels, harris_response, hysteresis_edges, EdgeMask, EdgePixel, EdgeThresholds,
};
pub use crate::gradient::GradientField;
pub use crate::kernel::scalar::ScalarKernel;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SimdKernel;
pub use crate::kernel::{early_exit_checkpoint, CellGrid, PoseOffsets, ScoreParams, VotePlan};
pub use crate::model::{train_model, DirectionIndex, PoseArena};
pub use crate::search::hough::hough_peak;
pub use crate::search::HoughPeak;
