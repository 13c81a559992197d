use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::errors::TelemetryError;

/// Functionality to add some Gaussian noise.
#[derive(Clone, Debug)]
pub(crate) struct GaussianNoise {
    normal: Normal<f32>,
}

impl GaussianNoise {
    /// Creates new distribution from mean and stdev.
    /// Returns an Other error if stdev is negative or not finite.
    pub(crate) fn new(mean: f32, stdev: f32) -> Result<Self, TelemetryError> {
        let normal = Normal::new(mean, stdev)
            .map_err(|e| TelemetryError::Other(format!("Invalid noise distribution: {}", e)))?;
        Ok(Self { normal })
    }

    /// Sample from distribution
    pub(crate) fn draw_sample(&self, rng: &mut StdRng) -> f32 {
        self.normal.sample(rng)
    }

    /// Adds independent noise to each component
    pub(crate) fn add_noise(&self, rng: &mut StdRng, data: [f32; 3]) -> [f32; 3] {
        data.map(|d| d + self.draw_sample(rng))
    }
}
