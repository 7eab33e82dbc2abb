//! Result exports.
//!
//! - response functions at a parameter set (CSV, one row per grid frequency)
//! - run reports (pretty JSON, `domain::RunReport`)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{CorrectionParams, RunReport};
use crate::error::{AppError, CalError};
use crate::math::unwrap_phase;
use crate::models::{CalibrationModel, TransferFunction};

/// One grid frequency of `C`, `G`, `R` and `K = R / R0`.
///
/// Phases are unwrapped along the grid (rad).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRow {
    pub freq: f64,
    pub c_abs: f64,
    pub c_arg: f64,
    pub g_abs: f64,
    pub g_arg: f64,
    pub r_abs: f64,
    pub r_arg: f64,
    pub k_amp_err: f64,
    pub k_arg: f64,
}

pub fn response_rows(model: &CalibrationModel, params: &CorrectionParams) -> Result<Vec<ResponseRow>, CalError> {
    let tf = model.transfer_functions(params)?;
    let k = tf.response.component_div(model.r0());

    let phase = |v: &TransferFunction| -> Vec<f64> {
        unwrap_phase(&v.iter().map(|z| z.arg()).collect::<Vec<_>>())
    };
    let (c_arg, g_arg, r_arg, k_arg) = (phase(&tf.sensing), phase(&tf.gain), phase(&tf.response), phase(&k));

    Ok((0..model.len())
        .map(|i| ResponseRow {
            freq: model.freq()[i],
            c_abs: tf.sensing[i].norm(),
            c_arg: c_arg[i],
            g_abs: tf.gain[i].norm(),
            g_arg: g_arg[i],
            r_abs: tf.response[i].norm(),
            r_arg: r_arg[i],
            k_amp_err: k[i].norm() - 1.0,
            k_arg: k_arg[i],
        })
        .collect())
}

pub fn write_response<W: Write>(writer: W, rows: &[ResponseRow]) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

/// Write the response functions of `model` at `params` to a CSV file.
pub fn write_response_csv(path: &Path, model: &CalibrationModel, params: &CorrectionParams) -> Result<(), AppError> {
    let rows = response_rows(model, params)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create response CSV '{}': {e}", path.display())))?;
    write_response(file, &rows)
        .map_err(|e| AppError::new(4, format!("Failed to write response CSV '{}': {e}", path.display())))
}

pub fn write_run_report(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(4, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

pub fn read_run_report(path: &Path) -> Result<RunReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: RunReport =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrectionStats, GridPolicy, SeriesSummary, TimeSeries};
    use crate::models::fixtures;
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    #[test]
    fn identity_rows_have_zero_error() {
        let model = fixtures::model();
        let rows = response_rows(&model, &CorrectionParams::identity()).unwrap();
        assert_eq!(rows.len(), model.len());
        for (row, r0) in rows.iter().zip(model.r0().iter()) {
            assert_abs_diff_eq!(row.r_abs, r0.norm(), epsilon = 1e-12 * r0.norm());
            assert_abs_diff_eq!(row.k_amp_err, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(row.k_arg, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn response_csv_has_header_and_one_row_per_frequency() {
        let model = fixtures::model();
        let rows = response_rows(&model, &CorrectionParams::identity().with_kappa_c(1.02)).unwrap();
        let mut buf = Vec::new();
        write_response(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("freq,c_abs,c_arg,g_abs,g_arg,r_abs,r_arg,k_amp_err,k_arg")
        );
        assert_eq!(lines.count(), model.len());
    }

    #[test]
    fn report_file_reads_back() {
        let ts = TimeSeries::from_sample_rate(vec![1.0, -1.0, 1.0, -1.0], 4.0, 10.0).unwrap();
        let report = RunReport {
            tool: "calstrain".to_string(),
            generated_at: Utc::now(),
            params: CorrectionParams::identity().with_delta_fc(3.0),
            grid_policy: GridPolicy::Strict,
            input: SeriesSummary::from(&ts),
            output: SeriesSummary::from(&ts),
            correction: CorrectionStats {
                max_amplitude_error: 0.01,
                max_phase_error: 0.002,
                peak_amplitude_freq: 341.0,
            },
        };
        let path = std::env::temp_dir().join(format!("calstrain-{}-report.json", std::process::id()));
        write_run_report(&path, &report).unwrap();
        let back = read_run_report(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.params, report.params);
        assert_eq!(back.input.samples, 4);
        assert_eq!(back.correction, report.correction);
        assert_eq!(back.generated_at, report.generated_at);
    }
}
