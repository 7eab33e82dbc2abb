//! Command-line parsing for the strain calibration adjuster.
//!
//! Argument parsing and command dispatch stay separate from the calibration
//! math: this module only describes flags, `app` turns them into configs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::adjust::SweepAxes;
use crate::domain::{CorrectionParams, GridPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "calstrain",
    version,
    about = "Re-calibrate gravitational-wave strain for time-dependent correction factors"
)]
pub struct Cli {
    /// Log filter directive (e.g. `debug`, `calstrain=trace`). Defaults to
    /// `CALSTRAIN_LOG`, then `info`.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a correction parameter set to a strain series.
    Adjust(AdjustArgs),
    /// Print (and optionally export) the response functions at a parameter set.
    Response(ResponseArgs),
    /// Adjust one strain series for a grid of parameter sets, in parallel.
    Sweep(SweepArgs),
    /// Write seeded Gaussian white-noise strain.
    Synth(SynthArgs),
}

/// Time-dependent correction parameters. Defaults are the identity.
#[derive(Debug, Args, Clone, Copy)]
pub struct ParamArgs {
    /// Shift of the coupled-cavity pole (Hz).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub delta_fc: f64,

    /// Scalar sensing correction.
    #[arg(long, default_value_t = 1.0)]
    pub kappa_c: f64,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub kappa_tst_re: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub kappa_tst_im: f64,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub kappa_pu_re: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub kappa_pu_im: f64,
}

impl ParamArgs {
    pub fn to_params(&self) -> CorrectionParams {
        CorrectionParams::from_parts(
            self.delta_fc,
            self.kappa_c,
            self.kappa_tst_re,
            self.kappa_tst_im,
            self.kappa_pu_re,
            self.kappa_pu_im,
        )
    }
}

/// Options shared by every command that transforms strain.
#[derive(Debug, Args, Clone, Copy)]
pub struct TransformArgs {
    /// Continue the correction linearly past the model grid instead of failing.
    #[arg(long)]
    pub extrapolate: bool,

    /// Plan every FFT from scratch (overrides `CALSTRAIN_FFT_CACHE`).
    #[arg(long)]
    pub no_fft_cache: bool,
}

impl TransformArgs {
    pub fn grid_policy(&self) -> GridPolicy {
        if self.extrapolate {
            GridPolicy::Extrapolate
        } else {
            GridPolicy::Strict
        }
    }
}

#[derive(Debug, Args)]
pub struct AdjustArgs {
    /// Model manifest (JSON) naming the reference transfer-function tables.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Input strain CSV (`time,strain`).
    #[arg(long, value_name = "CSV")]
    pub strain: PathBuf,

    /// Output strain CSV.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    #[command(flatten)]
    pub params: ParamArgs,

    #[command(flatten)]
    pub transform: TransformArgs,

    /// Write a JSON run report.
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ResponseArgs {
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Export `C`, `G`, `R` and `K` on the model grid to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    #[arg(long, value_name = "CSV")]
    pub strain: PathBuf,

    /// Comma-separated pole shifts (Hz).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub delta_fc: Vec<f64>,

    #[arg(long, value_delimiter = ',')]
    pub kappa_c: Vec<f64>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub kappa_tst_re: Vec<f64>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub kappa_tst_im: Vec<f64>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub kappa_pu_re: Vec<f64>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub kappa_pu_im: Vec<f64>,

    #[command(flatten)]
    pub transform: TransformArgs,
}

impl SweepArgs {
    pub fn axes(&self) -> SweepAxes {
        SweepAxes {
            delta_fc: self.delta_fc.clone(),
            kappa_c: self.kappa_c.clone(),
            kappa_tst_re: self.kappa_tst_re.clone(),
            kappa_tst_im: self.kappa_tst_im.clone(),
            kappa_pu_re: self.kappa_pu_re.clone(),
            kappa_pu_im: self.kappa_pu_im.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct SynthArgs {
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Samples per second (Hz).
    #[arg(long, default_value_t = 4096.0)]
    pub sample_rate: f64,

    /// Length (s).
    #[arg(long, default_value_t = 4.0)]
    pub duration: f64,

    /// GPS time of the first sample.
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Per-sample standard deviation.
    #[arg(long, default_value_t = 1e-21)]
    pub sigma: f64,
}
