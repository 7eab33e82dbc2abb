//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - passed between the calibration model, the adjuster and the sweep
//! - exported to JSON/CSV
//! - built directly from CLI flags

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::CalError;

/// Time-dependent correction parameters applied to the epoch-t0 model.
///
/// `Default` is the identity: no change from the reference epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParamsRecord", into = "ParamsRecord")]
pub struct CorrectionParams {
    /// Shift of the coupled-cavity pole, `fc(t) - fc(t0)` (Hz).
    pub delta_fc: f64,
    /// Scalar correction of the sensing function.
    pub kappa_c: f64,
    /// Complex correction of the test-mass actuation path.
    pub kappa_tst: Complex64,
    /// Complex correction of the penultimate-mass actuation path.
    pub kappa_pu: Complex64,
}

impl Default for CorrectionParams {
    fn default() -> Self {
        Self {
            delta_fc: 0.0,
            kappa_c: 1.0,
            kappa_tst: Complex64::new(1.0, 0.0),
            kappa_pu: Complex64::new(1.0, 0.0),
        }
    }
}

impl CorrectionParams {
    /// Identity parameter set.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from the real/imaginary pair convention used on the command line.
    pub fn from_parts(
        delta_fc: f64,
        kappa_c: f64,
        kappa_tst_re: f64,
        kappa_tst_im: f64,
        kappa_pu_re: f64,
        kappa_pu_im: f64,
    ) -> Self {
        Self {
            delta_fc,
            kappa_c,
            kappa_tst: Complex64::new(kappa_tst_re, kappa_tst_im),
            kappa_pu: Complex64::new(kappa_pu_re, kappa_pu_im),
        }
    }

    pub fn with_delta_fc(mut self, delta_fc: f64) -> Self {
        self.delta_fc = delta_fc;
        self
    }

    pub fn with_kappa_c(mut self, kappa_c: f64) -> Self {
        self.kappa_c = kappa_c;
        self
    }

    pub fn with_kappa_tst(mut self, kappa_tst: Complex64) -> Self {
        self.kappa_tst = kappa_tst;
        self
    }

    pub fn with_kappa_pu(mut self, kappa_pu: Complex64) -> Self {
        self.kappa_pu = kappa_pu;
        self
    }

    /// True when every parameter is exactly at its identity value.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Reject non-finite parameters before they reach the transfer functions.
    pub fn validate(&self) -> Result<(), CalError> {
        let finite = self.delta_fc.is_finite()
            && self.kappa_c.is_finite()
            && self.kappa_tst.is_finite()
            && self.kappa_pu.is_finite();
        if !finite {
            return Err(CalError::invalid(format!(
                "Correction parameters must be finite: {self}"
            )));
        }
        // C scales with kappa_c and R = (1 + G) / C.
        if self.kappa_c == 0.0 {
            return Err(CalError::invalid(
                "kappa_c must be non-zero: the sensing function would vanish.",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for CorrectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "delta_fc={:.4} kappa_c={:.4} kappa_tst={:.4}{:+.4}j kappa_pu={:.4}{:+.4}j",
            self.delta_fc,
            self.kappa_c,
            self.kappa_tst.re,
            self.kappa_tst.im,
            self.kappa_pu.re,
            self.kappa_pu.im
        )
    }
}

/// Flat serialized form of `CorrectionParams` (real/imaginary pairs).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct ParamsRecord {
    delta_fc: f64,
    kappa_c: f64,
    kappa_tst_re: f64,
    kappa_tst_im: f64,
    kappa_pu_re: f64,
    kappa_pu_im: f64,
}

impl Default for ParamsRecord {
    fn default() -> Self {
        CorrectionParams::default().into()
    }
}

impl From<ParamsRecord> for CorrectionParams {
    fn from(r: ParamsRecord) -> Self {
        CorrectionParams::from_parts(
            r.delta_fc,
            r.kappa_c,
            r.kappa_tst_re,
            r.kappa_tst_im,
            r.kappa_pu_re,
            r.kappa_pu_im,
        )
    }
}

impl From<CorrectionParams> for ParamsRecord {
    fn from(p: CorrectionParams) -> Self {
        ParamsRecord {
            delta_fc: p.delta_fc,
            kappa_c: p.kappa_c,
            kappa_tst_re: p.kappa_tst.re,
            kappa_tst_im: p.kappa_tst.im,
            kappa_pu_re: p.kappa_pu.re,
            kappa_pu_im: p.kappa_pu.im,
        }
    }
}

/// Uniformly sampled, real-valued time series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub data: Vec<f64>,
    /// Sample spacing (s).
    pub delta_t: f64,
    /// Time stamp of the first sample (GPS seconds).
    pub start_time: f64,
}

impl TimeSeries {
    pub fn new(data: Vec<f64>, delta_t: f64, start_time: f64) -> Result<Self, CalError> {
        if !(delta_t.is_finite() && delta_t > 0.0) {
            return Err(CalError::invalid(format!(
                "Sample spacing must be finite and > 0, got {delta_t}."
            )));
        }
        if !start_time.is_finite() {
            return Err(CalError::invalid("Start time must be finite."));
        }
        Ok(Self {
            data,
            delta_t,
            start_time,
        })
    }

    pub fn from_sample_rate(data: Vec<f64>, sample_rate: f64, start_time: f64) -> Result<Self, CalError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(CalError::invalid(format!(
                "Sample rate must be finite and > 0, got {sample_rate}."
            )));
        }
        Self::new(data, 1.0 / sample_rate, start_time)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.delta_t
    }

    /// Duration covered by the samples, `len · delta_t`.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 * self.delta_t
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    pub fn sample_times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.data.len()).map(move |i| self.start_time + i as f64 * self.delta_t)
    }

    /// Root-mean-square of the samples (0 for an empty series).
    pub fn rms(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let ss: f64 = self.data.iter().map(|x| x * x).sum();
        (ss / self.data.len() as f64).sqrt()
    }
}

/// One-sided spectrum of a real time series.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySeries {
    pub data: Vec<Complex64>,
    /// Bin spacing (Hz).
    pub delta_f: f64,
    /// Start time of the series this spectrum came from.
    pub epoch: f64,
    /// Length of the originating time series (needed to invert odd lengths).
    pub time_len: usize,
}

impl FrequencySeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Frequency of every bin, `k · delta_f`.
    pub fn sample_frequencies(&self) -> Vec<f64> {
        (0..self.data.len()).map(|k| k as f64 * self.delta_f).collect()
    }

    /// Sample spacing of the time series this spectrum inverts to.
    pub fn delta_t(&self) -> f64 {
        1.0 / (self.time_len as f64 * self.delta_f)
    }
}

/// How to treat spectrum bins that fall outside the calibration grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GridPolicy {
    /// Fail with `CalError::ValueGrid`.
    #[default]
    Strict,
    /// Continue the end segments of the linear fit (explicit opt-in).
    Extrapolate,
}

/// A full `adjust` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AdjustConfig {
    pub model_path: PathBuf,
    pub strain_path: PathBuf,
    pub out_path: PathBuf,
    pub params: CorrectionParams,
    pub grid_policy: GridPolicy,
    pub cache_plans: bool,
    pub report_path: Option<PathBuf>,
}

/// Summary of one adjustment run (JSON export).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub params: CorrectionParams,
    pub grid_policy: GridPolicy,
    pub input: SeriesSummary,
    pub output: SeriesSummary,
    pub correction: CorrectionStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub sample_rate: f64,
    pub duration: f64,
    pub start_time: f64,
    pub rms: f64,
}

impl From<&TimeSeries> for SeriesSummary {
    fn from(ts: &TimeSeries) -> Self {
        SeriesSummary {
            samples: ts.len(),
            sample_rate: ts.sample_rate(),
            duration: ts.duration(),
            start_time: ts.start_time,
            rms: ts.rms(),
        }
    }
}

/// Extremes of the error function `K = R / R0` over the calibration grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStats {
    /// max |(|K| - 1)|
    pub max_amplitude_error: f64,
    /// max |arg K| (rad)
    pub max_phase_error: f64,
    /// Frequency at which the amplitude error peaks (Hz).
    pub peak_amplitude_freq: f64,
}
