pub mod image;
pub mod mat3;
pub mod sampler;

pub use image::*;
pub use mat3::*;
pub use sampler::*;
