use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random sampler threaded through the robust estimators
///
/// An explicit value rather than process-global state: callers that need
/// reproducible runs construct it with `with_seed`.
#[derive(Debug)]
pub struct UniformSampler {
    rng: StdRng,
}

impl UniformSampler {
    /// Sampler seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministically seeded sampler
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in `[0, 1)`
    pub fn sample_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform sample in `[0, 1)`
    pub fn sample_f64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Uniform index in `[0, n)`
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }
}

impl Default for UniformSampler {
    fn default() -> Self {
        Self::new()
    }
}
