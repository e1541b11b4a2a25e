pub mod fundamental;
pub mod homography;
pub mod point_match;
pub mod stats;
pub mod usac;

pub use fundamental::*;
pub use homography::*;
pub use point_match::*;
pub use stats::*;
pub use usac::*;
