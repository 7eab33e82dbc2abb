//! Shared test fixture: a smooth single-pole model on a grid from DC to 8 kHz.

use num_complex::Complex64;

use super::{CalibrationInputs, CalibrationModel};

pub const FC0: f64 = 341.0;
pub const F_MAX: f64 = 8192.0;

/// DC followed by log-spaced points up to `F_MAX`.
pub fn grid() -> Vec<f64> {
    let n = 400;
    let (lo, hi) = (0.5_f64.ln(), F_MAX.ln());
    let mut freq = Vec::with_capacity(n + 1);
    freq.push(0.0);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        freq.push((lo + u * (hi - lo)).exp());
    }
    // Pin the last point so rounding in exp/ln cannot leave Nyquist uncovered.
    freq[n] = F_MAX;
    freq
}

fn pole(f: f64, fp: f64) -> Complex64 {
    Complex64::new(1.0, f / fp)
}

pub fn inputs() -> CalibrationInputs {
    let freq = grid();
    let c0 = freq.iter().map(|&f| 2.0 / pole(f, FC0)).collect();
    let d0 = freq.iter().map(|&f| 50.0 * pole(f, 20.0) / pole(f, 500.0)).collect();
    let a_tst0 = freq.iter().map(|&f| 0.4 / (pole(f, 10.0) * pole(f, 10.0))).collect();
    let a_pu0 = freq.iter().map(|&f| 0.6 / (pole(f, 5.0) * pole(f, 5.0))).collect();
    CalibrationInputs::new(freq)
        .with_fc0(FC0)
        .with_c0(c0)
        .with_digital(d0)
        .with_actuation(a_tst0, a_pu0)
}

pub fn model() -> CalibrationModel {
    CalibrationModel::new(inputs()).expect("fixture model is valid")
}
