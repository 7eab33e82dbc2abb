//! Phase unwrapping.
//!
//! `arg(z)` is only defined modulo 2π. Interpolating a wrapped phase across a
//! ±π crossing produces a spurious jump of almost 2π between two grid points,
//! so the phase of the error function is unwrapped before it is fitted.
//!
//! The rule is the usual one (same result as numpy's `unwrap` with its
//! defaults): whenever consecutive samples differ by more than π, add the
//! multiple of 2π that brings the difference back into `[-π, π]`.

use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Unwrap a sequence of phases (radians).
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let Some(&first) = phase.first() else {
        return out;
    };
    out.push(first);

    let mut correction = 0.0;
    for pair in phase.windows(2) {
        let dd = pair[1] - pair[0];
        let mut ddmod = (dd + PI).rem_euclid(TWO_PI) - PI;
        // An exact jump of +π stays +π rather than folding to -π.
        if ddmod == -PI && dd > 0.0 {
            ddmod = PI;
        }
        if dd.abs() >= PI {
            correction += ddmod - dd;
        }
        out.push(pair[1] + correction);
    }
    out
}
