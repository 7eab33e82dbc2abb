//! Transfer-function error helpers.
//!
//! The error function between a measured and a true response is
//!
//! ```text
//! K(f) = R_measured(f) / R_true(f) = (1 + δA/A) · exp(i δφ)
//! ```
//!
//! so the fractional amplitude error is `|K| - 1` and the phase error `arg K`.

use nalgebra::DVector;
use num_complex::Complex64;

use crate::domain::CorrectionStats;
use crate::error::CalError;

/// Linear amplitude in decibels.
pub fn amp_to_db(amp: f64) -> f64 {
    20.0 * amp.log10()
}

/// `K`, `δA/A` and `δφ` for a pair of responses sampled on the same grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferError {
    pub k: DVector<Complex64>,
    pub amplitude: Vec<f64>,
    pub phase: Vec<f64>,
}

pub fn transfer_function_error(
    r_true: &DVector<Complex64>,
    r_measured: &DVector<Complex64>,
) -> Result<TransferError, CalError> {
    if r_true.len() != r_measured.len() {
        return Err(CalError::invalid(format!(
            "Response lengths differ: true={} measured={}",
            r_true.len(),
            r_measured.len()
        )));
    }
    let k = r_measured.component_div(r_true);
    let amplitude = k.iter().map(|z| z.norm() - 1.0).collect();
    let phase = k.iter().map(|z| z.arg()).collect();
    Ok(TransferError { k, amplitude, phase })
}

impl TransferError {
    /// Extremes over the grid `freq` (same length as `k`).
    pub fn stats(&self, freq: &DVector<f64>) -> CorrectionStats {
        let mut max_amplitude_error = 0.0_f64;
        let mut peak_amplitude_freq = freq.get(0).copied().unwrap_or(0.0);
        for (a, f) in self.amplitude.iter().zip(freq.iter()) {
            if a.abs() > max_amplitude_error {
                max_amplitude_error = a.abs();
                peak_amplitude_freq = *f;
            }
        }
        let max_phase_error = self.phase.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
        CorrectionStats {
            max_amplitude_error,
            max_phase_error,
            peak_amplitude_freq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn amplitude_in_decibels() {
        assert_abs_diff_eq!(amp_to_db(10.0), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(amp_to_db(1.0), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(amp_to_db(0.5), -6.0206, epsilon = 1e-4);
    }

    #[test]
    fn error_of_scaled_and_rotated_response() {
        let r_true = DVector::from_vec(vec![Complex64::new(2.0, 0.0), Complex64::new(0.0, 1.0)]);
        let rot = Complex64::from_polar(1.1, 0.2);
        let r_meas = r_true.map(|z| z * rot);
        let err = transfer_function_error(&r_true, &r_meas).unwrap();
        for i in 0..2 {
            assert_abs_diff_eq!(err.amplitude[i], 0.1, epsilon = 1e-12);
            assert_abs_diff_eq!(err.phase[i], 0.2, epsilon = 1e-12);
        }

        let stats = err.stats(&DVector::from_vec(vec![10.0, 20.0]));
        assert_abs_diff_eq!(stats.max_amplitude_error, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.max_phase_error, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let a = DVector::from_element(2, Complex64::new(1.0, 0.0));
        let b = DVector::from_element(3, Complex64::new(1.0, 0.0));
        assert!(transfer_function_error(&a, &b).is_err());
    }
}
