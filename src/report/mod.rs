//! Reporting utilities: correction statistics, run reports and formatted
//! terminal output.
//!
//! Formatting lives in `format` so the calibration code never builds strings.

pub mod format;

pub use format::*;

use chrono::Utc;

use crate::domain::{CorrectionParams, CorrectionStats, GridPolicy, RunReport, SeriesSummary, TimeSeries};
use crate::error::CalError;
use crate::math::transfer_function_error;
use crate::models::CalibrationModel;

pub const TOOL_NAME: &str = "calstrain";

/// Extremes of `K = R / R0` over the model grid.
pub fn correction_stats(model: &CalibrationModel, params: &CorrectionParams) -> Result<CorrectionStats, CalError> {
    let r = model.update_response(params)?;
    Ok(transfer_function_error(model.r0(), &r)?.stats(model.freq()))
}

/// Assemble the JSON report of one `adjust` run.
pub fn build_run_report(
    params: CorrectionParams,
    grid_policy: GridPolicy,
    input: &TimeSeries,
    output: &TimeSeries,
    correction: CorrectionStats,
) -> RunReport {
    RunReport {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        params,
        grid_policy,
        input: SeriesSummary::from(input),
        output: SeriesSummary::from(output),
        correction,
    }
}
