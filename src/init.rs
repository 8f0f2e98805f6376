//! Pluggable parameter-initialization strategies.
//!
//! Every strategy draws scalars from a caller-supplied [`StdRng`], so a run
//! seeded through [`crate::network::Network::init`] is fully reproducible.
//! The strategies are a tagged enum rather than a trait hierarchy; layers
//! hold one by value.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

/// A scalar sampling strategy for trainable parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Uniform draw from `[low, high)`.
    Uniform { low: f32, high: f32 },
    /// Normal draw with the given mean and standard deviation.
    Normal { mean: f32, std: f32 },
    /// Xavier/Glorot normal draw, `N(0, sqrt(2 / fan))`.
    Xavier { fan: usize },
    /// Kaiming/He normal draw with the leaky-ReLU default negative-slope
    /// correction, `N(0, sqrt(2 / (6 * fan)))`.
    Kaiming { fan: usize },
}

impl Init {
    /// Uniform over `[0, 1)`.
    pub fn uniform() -> Self {
        Init::Uniform { low: 0.0, high: 1.0 }
    }

    /// Standard normal.
    pub fn normal() -> Self {
        Init::Normal { mean: 0.0, std: 1.0 }
    }

    /// Xavier scaled to a fan of `fan` units.
    ///
    /// # Panics
    /// Panics if `fan` is zero.
    pub fn xavier(fan: usize) -> Self {
        assert!(fan > 0, "xavier fan must be nonzero");
        Init::Xavier { fan }
    }

    /// Kaiming scaled to a fan of `fan` units.
    ///
    /// # Panics
    /// Panics if `fan` is zero.
    pub fn kaiming(fan: usize) -> Self {
        assert!(fan > 0, "kaiming fan must be nonzero");
        Init::Kaiming { fan }
    }

    /// Draws one scalar from this strategy.
    pub fn sample(&self, rng: &mut StdRng) -> f32 {
        match *self {
            Init::Uniform { low, high } => rng.random_range(low..high),
            Init::Normal { mean, std } => {
                let z: f32 = rng.sample(StandardNormal);
                mean + std * z
            }
            Init::Xavier { fan } => {
                let z: f32 = rng.sample(StandardNormal);
                (2.0 / fan as f32).sqrt() * z
            }
            Init::Kaiming { fan } => {
                let z: f32 = rng.sample(StandardNormal);
                (2.0 / (6.0 * fan as f32)).sqrt() * z
            }
        }
    }
}
