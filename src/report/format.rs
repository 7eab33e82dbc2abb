//! Formatted terminal output.
//!
//! Output changes stay localized here.

use crate::adjust::SweepOutcome;
use crate::domain::{CorrectionParams, CorrectionStats, RunReport, TimeSeries};
use crate::io::ResponseRow;
use crate::math::amp_to_db;
use crate::models::CalibrationModel;

/// Frequencies (Hz) shown in the response table; each maps to its nearest
/// grid row.
const PROBE_FREQS: [f64; 7] = [10.0, 30.0, 100.0, 300.0, 1000.0, 3000.0, 5000.0];

/// Summary of an `adjust` run.
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== calstrain - strain adjustment ===\n");
    out.push_str(&format!("Params: {}\n", fmt_params(&report.params)));
    out.push_str(&format!("Grid policy: {:?}\n", report.grid_policy));
    out.push_str(&format!(
        "Input : n={} | fs={:.3} Hz | T={:.3} s | t0={:.6} | rms={:.4e}\n",
        report.input.samples,
        report.input.sample_rate,
        report.input.duration,
        report.input.start_time,
        report.input.rms
    ));
    out.push_str(&format!(
        "Output: n={} | fs={:.3} Hz | T={:.3} s | t0={:.6} | rms={:.4e}\n",
        report.output.samples,
        report.output.sample_rate,
        report.output.duration,
        report.output.start_time,
        report.output.rms
    ));
    out.push_str(&fmt_stats(&report.correction));

    out
}

/// Model grid, parameters, a probe table of the response functions and the
/// `K` extremes.
pub fn format_response_summary(
    model: &CalibrationModel,
    params: &CorrectionParams,
    rows: &[ResponseRow],
    stats: &CorrectionStats,
) -> String {
    let mut out = String::new();
    let (fmin, fmax) = model.frequency_range();

    out.push_str("=== calstrain - response functions ===\n");
    out.push_str(&format!("Params: {}\n", fmt_params(params)));
    out.push_str(&format!(
        "Grid: n={} | f=[{:.3}, {:.3}] Hz | fc0={}\n",
        model.len(),
        fmin,
        fmax,
        model.fc0().map(|f| format!("{f:.3} Hz")).unwrap_or_else(|| "n/a".to_string())
    ));
    out.push('\n');

    out.push_str(
        format!(
            "{:>10} {:>12} {:>12} {:>12} {:>12} {:>10} {:>10}\n",
            "freq", "|C|", "|G|", "|R|", "|K|-1", "|K|(dB)", "argK(deg)"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<12} {:-<12} {:-<12} {:-<12} {:-<10} {:-<10}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    let mut shown: Vec<usize> = PROBE_FREQS
        .iter()
        .filter(|&&f| f >= fmin && f <= fmax)
        .filter_map(|&f| nearest_row(rows, f))
        .collect();
    shown.dedup();
    for i in shown {
        let r = &rows[i];
        out.push_str(&format!(
            "{:>10.2} {:>12.4e} {:>12.4e} {:>12.4e} {:>12.3e} {:>10.4} {:>10.4}\n",
            r.freq,
            r.c_abs,
            r.g_abs,
            r.r_abs,
            r.k_amp_err,
            amp_to_db(1.0 + r.k_amp_err),
            r.k_arg.to_degrees()
        ));
    }
    out.push('\n');
    out.push_str(&fmt_stats(stats));

    out
}

/// One line per sweep run: parameters and the RMS change it caused.
pub fn format_sweep_table(outcomes: &[SweepOutcome], input: &TimeSeries) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:>9} {:>8} {:>18} {:>18} {:>12}\n",
            "delta_fc", "kappa_c", "kappa_tst", "kappa_pu", "rel_change"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<9} {:-<8} {:-<18} {:-<18} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    let mut failed = 0usize;
    for o in outcomes {
        let p = &o.params;
        let change = match &o.result {
            Ok(_) => o
                .relative_change(input)
                .map(|v| format!("{v:>12.4e}"))
                .unwrap_or_else(|| format!("{:>12}", "n/a")),
            Err(e) => {
                failed += 1;
                format!("error: {}", truncate(&e.to_string(), 60))
            }
        };
        out.push_str(&format!(
            "{:>9.3} {:>8.4} {:>18} {:>18} {change}\n",
            p.delta_fc,
            p.kappa_c,
            fmt_complex(p.kappa_tst.re, p.kappa_tst.im),
            fmt_complex(p.kappa_pu.re, p.kappa_pu.im),
        ));
    }

    out.push_str(&format!("\nRuns: {} | failed: {failed}\n", outcomes.len()));
    out
}

fn fmt_stats(stats: &CorrectionStats) -> String {
    format!(
        "Correction: max||K|-1|={:.4e} (at {:.2} Hz) | max|argK|={:.4e} rad\n",
        stats.max_amplitude_error, stats.peak_amplitude_freq, stats.max_phase_error
    )
}

fn fmt_params(p: &CorrectionParams) -> String {
    if p.is_identity() {
        return "identity".to_string();
    }
    format!(
        "delta_fc={:.4} Hz, kappa_c={:.4}, kappa_tst={}, kappa_pu={}",
        p.delta_fc,
        p.kappa_c,
        fmt_complex(p.kappa_tst.re, p.kappa_tst.im),
        fmt_complex(p.kappa_pu.re, p.kappa_pu.im)
    )
}

fn fmt_complex(re: f64, im: f64) -> String {
    format!("{re:.4}{im:+.4}j")
}

fn nearest_row(rows: &[ResponseRow], f: f64) -> Option<usize> {
    rows.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (a.freq - f)
                .abs()
                .partial_cmp(&(b.freq - f).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
