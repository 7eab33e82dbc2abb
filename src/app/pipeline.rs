//! Command workflows, kept apart from argument handling and printing.
//!
//! manifest -> model, CSV -> strain, adjust/sweep/response, exports.
//! The CLI layer only formats what these return.

use std::path::Path;

use tracing::info;

use crate::adjust::{AdjustOptions, StrainAdjuster, SweepAxes, SweepOutcome, grid, run_sweep};
use crate::data::{NoiseConfig, generate_noise};
use crate::domain::{AdjustConfig, CorrectionParams, CorrectionStats, GridPolicy, RunReport, TimeSeries};
use crate::error::AppError;
use crate::io::{ResponseRow, load_model, read_strain_csv, response_rows, write_response_csv, write_run_report, write_strain_csv};
use crate::models::CalibrationModel;
use crate::report::{build_run_report, correction_stats};
use crate::spectral::FftSettings;

/// Everything an `adjust` run produced.
#[derive(Debug, Clone)]
pub struct AdjustOutput {
    pub input: TimeSeries,
    pub output: TimeSeries,
    pub report: RunReport,
}

#[derive(Debug, Clone)]
pub struct ResponseOutput {
    pub model: CalibrationModel,
    pub rows: Vec<ResponseRow>,
    pub stats: CorrectionStats,
}

#[derive(Debug, Clone)]
pub struct SweepRun {
    pub input: TimeSeries,
    pub outcomes: Vec<SweepOutcome>,
}

pub fn adjust_options(grid_policy: GridPolicy, cache_plans: bool) -> AdjustOptions {
    AdjustOptions {
        grid: grid_policy,
        fft: FftSettings { cache_plans },
    }
}

/// Load, adjust, write. The report file is written only when configured.
pub fn run_adjust(config: &AdjustConfig) -> Result<AdjustOutput, AppError> {
    let model = load_model(&config.model_path)?;
    let input = read_strain_csv(&config.strain_path)?;
    info!(
        samples = input.len(),
        sample_rate = input.sample_rate(),
        start_time = input.start_time,
        "loaded strain"
    );

    let options = adjust_options(config.grid_policy, config.cache_plans);
    let output = StrainAdjuster::new(&model, options).adjust(&input, &config.params)?;
    write_strain_csv(&config.out_path, &output)?;
    info!(path = %config.out_path.display(), "wrote adjusted strain");

    let stats = correction_stats(&model, &config.params)?;
    let report = build_run_report(config.params, config.grid_policy, &input, &output, stats);
    if let Some(path) = &config.report_path {
        write_run_report(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(AdjustOutput { input, output, report })
}

pub fn run_response(model_path: &Path, params: &CorrectionParams, export: Option<&Path>) -> Result<ResponseOutput, AppError> {
    params.validate()?;
    let model = load_model(model_path)?;
    let rows = response_rows(&model, params)?;
    let stats = correction_stats(&model, params)?;
    if let Some(path) = export {
        write_response_csv(path, &model, params)?;
        info!(path = %path.display(), rows = rows.len(), "wrote response CSV");
    }
    Ok(ResponseOutput { model, rows, stats })
}

pub fn run_parameter_sweep(
    model_path: &Path,
    strain_path: &Path,
    axes: &SweepAxes,
    options: AdjustOptions,
) -> Result<SweepRun, AppError> {
    let model = load_model(model_path)?;
    let input = read_strain_csv(strain_path)?;
    let params = grid(axes);
    let outcomes = run_sweep(&input, &model, &params, options);
    Ok(SweepRun { input, outcomes })
}

pub fn run_synth(config: &NoiseConfig, out: &Path) -> Result<TimeSeries, AppError> {
    let series = generate_noise(config)?;
    write_strain_csv(out, &series)?;
    info!(path = %out.display(), samples = series.len(), seed = config.seed, "wrote synthetic strain");
    Ok(series)
}
