//! Error types for shapematch.

use thiserror::Error;

/// Result alias for shapematch operations.
pub type ShapeMatchResult<T> = std::result::Result<T, ShapeMatchError>;

/// Errors that can occur while training models or matching images.
///
/// Matching never surfaces these as `Err`; they are folded into a failed
/// [`MatchResult`](crate::MatchResult) instead. Training returns them directly.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ShapeMatchError {
    /// The search image has more than one channel.
    #[error("expected a single-channel image, got {channels} channels")]
    InputChannelMismatch { channels: usize },
    /// No enabled model holds enough edge points to be matched.
    #[error("no enabled trained model")]
    NoTrainedModel,
    /// Edge extraction on the template produced too few points.
    #[error("template yielded {points} edge points, at least {required} required")]
    DegenerateTrainingInput { points: usize, required: usize },
    /// The best score across all models stayed below the threshold.
    #[error("no match found (closest score {best_score:.3})")]
    NoMatchFound { best_score: f32 },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The row stride is smaller than the width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A rectangle does not fit inside the image.
    #[error("roi ({x}, {y}, {width}x{height}) exceeds image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Image decoding or loading failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
    /// An unexpected fault inside the matching pipeline.
    #[error("internal fault: {0}")]
    Internal(String),
}
