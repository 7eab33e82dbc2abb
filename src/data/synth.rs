//! Synthetic strain generation.
//!
//! Seeded Gaussian white noise, for trying the adjuster without real detector
//! data. The same settings always produce the same series.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::TimeSeries;
use crate::error::CalError;

/// Settings for `generate_noise`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    /// Samples per second (Hz).
    pub sample_rate: f64,
    /// Length of the series (s).
    pub duration: f64,
    /// GPS time of the first sample.
    pub start_time: f64,
    /// Standard deviation of each sample.
    pub sigma: f64,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sample_rate: 4096.0,
            duration: 4.0,
            start_time: 0.0,
            sigma: 1e-21,
            seed: 42,
        }
    }
}

pub fn generate_noise(config: &NoiseConfig) -> Result<TimeSeries, CalError> {
    if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
        return Err(CalError::invalid("Sample rate must be finite and > 0."));
    }
    if !(config.duration.is_finite() && config.duration > 0.0) {
        return Err(CalError::invalid("Duration must be finite and > 0."));
    }
    // rand_distr's Normal accepts a negative std dev (it mirrors the samples).
    if !(config.sigma.is_finite() && config.sigma >= 0.0) {
        return Err(CalError::invalid(format!(
            "Noise sigma must be finite and >= 0 (got {}).",
            config.sigma
        )));
    }

    let n = (config.sample_rate * config.duration).round() as usize;
    if n < 2 {
        return Err(CalError::invalid(format!(
            "Duration {}s at {} Hz gives fewer than two samples.",
            config.duration, config.sample_rate
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.sigma)
        .map_err(|e| CalError::invalid(format!("Noise distribution error: {e}")))?;
    let data = (0..n).map(|_| normal.sample(&mut rng)).collect();

    TimeSeries::from_sample_rate(data, config.sample_rate, config.start_time)
}
