//! Size hints for generators, biased toward small values.

use crate::config::GeneratorConfig;
use crate::rng::Randomness;

/// Geometric distribution over the non-negative integers
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricDistribution;

impl GeometricDistribution {
    /// Sample with success probability `1 / mean`
    ///
    /// `mean` must be at least 1.
    pub fn sample_with_mean(&self, mean: f64, random: &mut dyn Randomness) -> usize {
        self.sample(Self::probability_of_mean(mean), random)
    }

    /// Sample the number of failures before the first success with probability `p`
    pub fn sample(&self, p: f64, random: &mut dyn Randomness) -> usize {
        if p >= 1.0 {
            return 0;
        }

        let uniform = random.next_double();
        ((1.0 - uniform).ln() / (1.0 - p).ln()).ceil() as usize
    }

    fn probability_of_mean(mean: f64) -> f64 {
        (1.0 / mean).clamp(f64::MIN_POSITIVE, 1.0)
    }
}

/// Per-draw size hint: geometric around a mean, clamped to a maximum
#[derive(Debug, Clone)]
pub struct SizeDistribution {
    geometric: GeometricDistribution,
    mean: f64,
    max: usize,
}

impl SizeDistribution {
    pub fn new(mean_size: usize, max_size: usize) -> Self {
        Self {
            geometric: GeometricDistribution,
            mean: mean_size.max(1) as f64,
            max: max_size,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.mean_size, config.max_size)
    }

    /// Draw the size for the next generated value
    pub fn next_size(&self, random: &mut dyn Randomness) -> usize {
        self.geometric
            .sample_with_mean(self.mean, random)
            .min(self.max)
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
