//! Shapematch locates a trained 2-D shape in grayscale images.
//!
//! Training extracts a capped, spatially spread set of oriented edge points
//! from a template. Matching votes rotations and translations with a
//! generalized Hough transform, then refines the best peak on a dense
//! angle/scale lattice scored by gradient-direction agreement, with parabolic
//! sub-pixel and sub-degree interpolation. Scoring runs on a portable kernel
//! or, with the `simd` feature, on an `f32x8` kernel selected at runtime;
//! `rayon` parallelizes voting across candidate angles.
//!
//! ```no_run
//! use shapematch::{MatchParams, PixelBuffer, ShapeMatcher};
//!
//! # fn main() -> shapematch::ShapeMatchResult<()> {
//! let template = vec![0u8; 50 * 50];
//! let scene = vec![0u8; 200 * 200];
//! let mut matcher = ShapeMatcher::new(MatchParams::default())?;
//! matcher.train("part", PixelBuffer::gray(&template, 50, 50)?, (0, 0))?;
//! let result = matcher.run(PixelBuffer::gray(&scene, 200, 200)?, None);
//! if result.success {
//!     println!("{:?}", result.pose);
//! }
//! # Ok(())
//! # }
//! ```

mod candidate;
pub mod edges;
pub mod gradient;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod model;
pub mod overlay;
mod refine;
pub mod search;
mod trace;
pub mod util;

pub use image::pyramid::ImagePyramid;
pub use image::{ImageView, OwnedImage, PixelBuffer, Rect};
pub use kernel::{Backend, Kernel};
pub use model::{EdgePoint, Model, ModelParts};
pub use overlay::Overlay;
pub use search::{MatchParams, MatchResult, MatchedModel, ModelScore, Pose, ShapeMatcher};
pub use util::{ShapeMatchError, ShapeMatchResult};
