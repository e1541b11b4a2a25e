pub mod keypoint;
pub mod matching;
pub mod sift;

pub use keypoint::*;
pub use matching::*;
pub use sift::*;
