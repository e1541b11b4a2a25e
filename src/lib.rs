//! # twoview
//!
//! Feature-based two-view geometry in pure Rust.
//!
//! The crate implements the classic sparse correspondence pipeline between a
//! pair of images: scale-invariant keypoint detection with gradient-orientation
//! descriptors, brute-force descriptor matching with Lowe's ratio test, and
//! robust estimation of a planar homography or an epipolar (fundamental)
//! relation over the putative matches.
//!
//! ## Modules
//!
//! - **core**: image containers, a column-major 3×3 matrix type, and the
//!   uniform sampler threaded through the robust estimators
//! - **imgproc**: Gaussian kernel design and separable smoothing
//! - **features2d**: keypoints, the SIFT detector/descriptor and the
//!   brute-force matcher
//! - **calib3d**: point matches, coordinate normalization, homography and
//!   fundamental-matrix fitting, and the sample-consensus driver
//! - **cache**: content-addressed on-disk shortcut for detection and matching
//!
//! ## Example
//!
//! ```rust,no_run
//! use twoview::prelude::*;
//! use twoview::features2d::{match_brute_force, SiftDetector, SiftParams};
//! use twoview::calib3d::{sort_by_match_cost, usac_estimate_homography_norm};
//!
//! # fn main() -> twoview::error::Result<()> {
//! let left = ByteImage::new(640, 480, 1)?;
//! let right = ByteImage::new(640, 480, 1)?;
//!
//! let mut detector = SiftDetector::new(SiftParams::default());
//! let mut keys = KeypointStore::new();
//! let mut keys_right = KeypointStore::new();
//! detector.compute(&left, &mut keys)?;
//! detector.compute(&right, &mut keys_right)?;
//!
//! let mut matches = match_brute_force(&keys, &keys_right, 0.8);
//! sort_by_match_cost(&mut matches);
//!
//! let mut sampler = UniformSampler::new();
//! let mut h = Mat3::identity();
//! let n_inliers =
//!     usac_estimate_homography_norm(&mut h, &mut matches, 3.0, 1000, &mut sampler);
//! println!("{n_inliers} inliers");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod calib3d;
pub mod core;
pub mod error;
pub mod features2d;
pub mod imgproc;

pub mod prelude {
    //! Convenience module that re-exports commonly used items
    pub use crate::core::{ByteImage, FloatImage, Mat3, UniformSampler};
    pub use crate::error::{Error, Result};
    pub use crate::features2d::{Keypoint, KeypointStore, SIFT_DESC_DIM};
    pub use crate::calib3d::{PointMatch2D, PointMatchStats};
}
