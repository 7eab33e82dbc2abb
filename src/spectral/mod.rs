//! Real-input spectral transforms.
//!
//! `SpectralEngine` turns a `TimeSeries` into its one-sided `FrequencySeries`
//! and back, using `realfft` plans. Normalisation follows the continuous
//! transform convention so that forward + inverse is the identity:
//!
//! ```text
//! X_k = Δt · Σ_n x_n e^{-2πikn/N}        x_n = Δf · Σ'_k X_k e^{+2πikn/N}
//! ```
//!
//! Planner behaviour is configuration (`FftSettings`), not part of the
//! calibration math.

use std::sync::Arc;

use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use tracing::{debug, trace};

use crate::domain::{FrequencySeries, TimeSeries};
use crate::error::CalError;

/// Environment variable that toggles plan caching (`0`/`false`/`no` disables).
pub const FFT_CACHE_ENV: &str = "CALSTRAIN_FFT_CACHE";

/// Spectral engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftSettings {
    /// Keep plans between calls. When off, every transform plans from scratch
    /// (less memory held by long-lived adjusters, more time per call).
    pub cache_plans: bool,
}

impl Default for FftSettings {
    fn default() -> Self {
        Self { cache_plans: true }
    }
}

impl FftSettings {
    /// Defaults overridden by `CALSTRAIN_FFT_CACHE` when it is set.
    pub fn from_env() -> Self {
        match std::env::var(FFT_CACHE_ENV) {
            Ok(v) => Self {
                cache_plans: parse_flag(&v).unwrap_or(true),
            },
            Err(_) => Self::default(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct SpectralEngine {
    planner: RealFftPlanner<f64>,
    settings: FftSettings,
}

impl Default for SpectralEngine {
    fn default() -> Self {
        Self::new(FftSettings::default())
    }
}

impl std::fmt::Debug for SpectralEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEngine")
            .field("settings", &self.settings)
            .finish()
    }
}

impl SpectralEngine {
    pub fn new(settings: FftSettings) -> Self {
        Self {
            planner: RealFftPlanner::new(),
            settings,
        }
    }

    fn forward_plan(&mut self, n: usize) -> Arc<dyn RealToComplex<f64>> {
        if !self.settings.cache_plans {
            self.planner = RealFftPlanner::new();
        }
        self.planner.plan_fft_forward(n)
    }

    fn inverse_plan(&mut self, n: usize) -> Arc<dyn ComplexToReal<f64>> {
        if !self.settings.cache_plans {
            self.planner = RealFftPlanner::new();
        }
        self.planner.plan_fft_inverse(n)
    }

    /// One-sided spectrum of `ts` (`N/2 + 1` bins).
    pub fn forward(&mut self, ts: &TimeSeries) -> Result<FrequencySeries, CalError> {
        let n = ts.len();
        if n == 0 {
            return Err(CalError::invalid("Cannot transform an empty time series."));
        }
        debug!(n, delta_t = ts.delta_t, "forward transform");

        let r2c = self.forward_plan(n);
        let mut input = ts.data.clone();
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum)
            .map_err(|e| CalError::Transform(e.to_string()))?;

        let dt = ts.delta_t;
        for bin in spectrum.iter_mut() {
            *bin *= dt;
        }

        Ok(FrequencySeries {
            data: spectrum,
            delta_f: 1.0 / (n as f64 * dt),
            epoch: ts.start_time,
            time_len: n,
        })
    }

    /// Real time series whose one-sided spectrum is `fs`.
    ///
    /// The imaginary parts of the DC bin (and the Nyquist bin for even lengths)
    /// cannot be represented by a real series and are dropped.
    pub fn inverse(&mut self, fs: &FrequencySeries) -> Result<TimeSeries, CalError> {
        let n = fs.time_len;
        if n == 0 {
            return Err(CalError::invalid("Cannot invert a spectrum of an empty series."));
        }
        if fs.len() != n / 2 + 1 {
            return Err(CalError::Transform(format!(
                "spectrum has {} bins, expected {} for {n} samples",
                fs.len(),
                n / 2 + 1
            )));
        }
        debug!(n, delta_f = fs.delta_f, "inverse transform");

        let c2r = self.inverse_plan(n);
        let mut spectrum: Vec<Complex64> = fs.data.clone();
        spectrum[0].im = 0.0;
        if n % 2 == 0 {
            let last = spectrum.len() - 1;
            trace!(dropped = spectrum[last].im, "zeroing Nyquist imaginary part");
            spectrum[last].im = 0.0;
        }

        let mut output = c2r.make_output_vec();
        c2r.process(&mut spectrum, &mut output)
            .map_err(|e| CalError::Transform(e.to_string()))?;

        let df = fs.delta_f;
        for x in output.iter_mut() {
            *x *= df;
        }

        TimeSeries::new(output, fs.delta_t(), fs.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn series(n: usize, fs: f64) -> TimeSeries {
        let data = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 13.0 * t).sin() + 0.25 * (2.0 * PI * 71.0 * t).cos() + 0.1
            })
            .collect();
        TimeSeries::from_sample_rate(data, fs, 1_000_000_000.0).unwrap()
    }

    #[test]
    fn round_trip_even_and_odd_lengths() {
        let mut engine = SpectralEngine::default();
        for n in [256, 255, 1000, 1001] {
            let ts = series(n, 512.0);
            let spec = engine.forward(&ts).unwrap();
            assert_eq!(spec.len(), n / 2 + 1);
            let back = engine.inverse(&spec).unwrap();
            assert_eq!(back.len(), n);
            assert_abs_diff_eq!(back.delta_t, ts.delta_t, epsilon = 1e-15);
            for (a, b) in back.data.iter().zip(&ts.data) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn forward_uses_continuous_normalisation() {
        let ts = TimeSeries::new(vec![1.0; 64], 0.5, 0.0).unwrap();
        let spec = SpectralEngine::default().forward(&ts).unwrap();
        // DC bin of a constant is N·Δt; everything else vanishes.
        assert_abs_diff_eq!(spec.data[0].re, 32.0, epsilon = 1e-12);
        assert!(spec.data[1..].iter().all(|z| z.norm() < 1e-12));
        assert_abs_diff_eq!(spec.delta_f, 1.0 / 32.0, epsilon = 1e-15);
        let freqs = spec.sample_frequencies();
        assert_abs_diff_eq!(freqs[32], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn uncached_engine_gives_the_same_answer() {
        let ts = series(300, 256.0);
        let a = SpectralEngine::default().forward(&ts).unwrap();
        let b = SpectralEngine::new(FftSettings { cache_plans: false })
            .forward(&ts)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn inverse_rejects_wrong_bin_count() {
        let fs = FrequencySeries {
            data: vec![Complex64::new(0.0, 0.0); 10],
            delta_f: 1.0,
            epoch: 0.0,
            time_len: 64,
        };
        assert!(matches!(
            SpectralEngine::default().inverse(&fs),
            Err(CalError::Transform(_))
        ));
    }

    #[test]
    fn empty_series_is_invalid() {
        let ts = TimeSeries::new(Vec::new(), 1.0, 0.0).unwrap();
        assert!(matches!(
            SpectralEngine::default().forward(&ts),
            Err(CalError::InvalidInput(_))
        ));
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }
}
