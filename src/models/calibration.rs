//! Calibration model for one detector epoch `t0`.
//!
//! The reference transfer functions are measured at `t0`:
//!
//! - `C0`: sensing function (or its reciprocal `1/C0`)
//! - `D0`: digital filter
//! - `A_tst0`, `A_pu0`: actuation of the test-mass and penultimate-mass stages
//!
//! From these we derive, once, the reference open-loop gain and response
//!
//! ```text
//! G0 = C0 · D0 · (A_tst0 + A_pu0)
//! R0 = (1 + G0) / C0
//! ```
//!
//! and, when the coupled-cavity pole `fc0` is known, the sensing residual with
//! the pole factored out, `C_res = C0 · (1 + i f / fc0)`. Time dependence is
//! then modelled by scalar corrections (`CorrectionParams`):
//!
//! ```text
//! C(f,t) = C_res · κ_c / (1 + i f / (fc0 + Δfc))
//! G(f,t) = C · D0 · (A_tst0 · κ_tst + A_pu0 · κ_pu)
//! R(f,t) = (1 + G) / C
//! ```
//!
//! Every update allocates new vectors; the reference arrays never change after
//! construction.

use nalgebra::DVector;
use num_complex::Complex64;
use tracing::debug;

use crate::domain::CorrectionParams;
use crate::error::CalError;

/// Complex transfer function sampled on the model's frequency grid.
pub type TransferFunction = DVector<Complex64>;

/// Raw inputs for `CalibrationModel::new`.
///
/// Exactly one of `c0` / `invc0` must be set.
#[derive(Debug, Clone, Default)]
pub struct CalibrationInputs {
    pub freq: Vec<f64>,
    pub fc0: Option<f64>,
    pub c0: Option<Vec<Complex64>>,
    pub invc0: Option<Vec<Complex64>>,
    pub d0: Vec<Complex64>,
    pub a_tst0: Vec<Complex64>,
    pub a_pu0: Vec<Complex64>,
}

impl CalibrationInputs {
    pub fn new(freq: Vec<f64>) -> Self {
        Self {
            freq,
            ..Self::default()
        }
    }

    /// Use a complex-valued frequency column; only the real parts are kept.
    pub fn with_complex_freq(freq: &[Complex64]) -> Self {
        let dropped = freq.iter().filter(|f| f.im != 0.0).count();
        if dropped > 0 {
            debug!(dropped, "discarding imaginary parts of frequency samples");
        }
        Self::new(freq.iter().map(|f| f.re).collect())
    }

    pub fn with_fc0(mut self, fc0: f64) -> Self {
        self.fc0 = Some(fc0);
        self
    }

    pub fn with_c0(mut self, c0: Vec<Complex64>) -> Self {
        self.c0 = Some(c0);
        self
    }

    pub fn with_invc0(mut self, invc0: Vec<Complex64>) -> Self {
        self.invc0 = Some(invc0);
        self
    }

    pub fn with_digital(mut self, d0: Vec<Complex64>) -> Self {
        self.d0 = d0;
        self
    }

    pub fn with_actuation(mut self, a_tst0: Vec<Complex64>, a_pu0: Vec<Complex64>) -> Self {
        self.a_tst0 = a_tst0;
        self.a_pu0 = a_pu0;
        self
    }
}

/// Sensing, gain and response at one parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunctions {
    pub sensing: TransferFunction,
    pub actuation: TransferFunction,
    pub gain: TransferFunction,
    pub response: TransferFunction,
}

/// Reference transfer functions of one epoch plus their derived invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    freq: DVector<f64>,
    fc0: Option<f64>,
    c0: TransferFunction,
    invc0: TransferFunction,
    d0: TransferFunction,
    a_tst0: TransferFunction,
    a_pu0: TransferFunction,
    g0: TransferFunction,
    r0: TransferFunction,
    c_res: Option<TransferFunction>,
}

impl CalibrationModel {
    pub fn new(inputs: CalibrationInputs) -> Result<Self, CalError> {
        let CalibrationInputs {
            freq,
            fc0,
            c0,
            invc0,
            d0,
            a_tst0,
            a_pu0,
        } = inputs;

        validate_grid(&freq)?;
        let n = freq.len();

        let (c0, invc0) = match (c0, invc0) {
            (Some(c0), None) => {
                check_len("c0", &c0, n)?;
                check_nonzero("c0", &c0, &freq)?;
                let c0 = DVector::from_vec(c0);
                let invc0 = c0.map(|z| z.inv());
                (c0, invc0)
            }
            (None, Some(invc0)) => {
                check_len("invc0", &invc0, n)?;
                check_nonzero("invc0", &invc0, &freq)?;
                let invc0 = DVector::from_vec(invc0);
                let c0 = invc0.map(|z| z.inv());
                (c0, invc0)
            }
            (None, None) => {
                return Err(CalError::invalid(
                    "No sensing function given: supply exactly one of `c0` or `invc0`.",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(CalError::invalid(
                    "Both `c0` and `invc0` given: supply exactly one of them.",
                ));
            }
        };

        check_len("d0", &d0, n)?;
        check_len("a_tst0", &a_tst0, n)?;
        check_len("a_pu0", &a_pu0, n)?;
        for (name, values) in [("d0", &d0), ("a_tst0", &a_tst0), ("a_pu0", &a_pu0)] {
            if let Some(i) = values.iter().position(|z| !z.is_finite()) {
                return Err(CalError::invalid(format!(
                    "`{name}` is not finite at {} Hz.",
                    freq[i]
                )));
            }
        }

        if let Some(fc0) = fc0 {
            if !fc0.is_finite() || fc0 == 0.0 {
                return Err(CalError::invalid(format!(
                    "Cavity pole `fc0` must be finite and non-zero, got {fc0}."
                )));
            }
        }

        let freq = DVector::from_vec(freq);
        let d0 = DVector::from_vec(d0);
        let a_tst0 = DVector::from_vec(a_tst0);
        let a_pu0 = DVector::from_vec(a_pu0);

        let g0 = open_loop_gain(&c0, &d0, &(&a_tst0 + &a_pu0));
        let r0 = response(&g0, &c0);

        if let Some(i) = r0.iter().position(|z| !z.is_finite() || z.norm() == 0.0) {
            return Err(CalError::invalid(format!(
                "Reference response R0 is zero or not finite at {} Hz.",
                freq[i]
            )));
        }

        let c_res = fc0.map(|fc0| c0.zip_map(&freq, |c, f| c * pole_factor(f, fc0)));

        debug!(
            samples = n,
            fmin = freq[0],
            fmax = freq[n - 1],
            fc0 = ?fc0,
            "built calibration model"
        );

        Ok(Self {
            freq,
            fc0,
            c0,
            invc0,
            d0,
            a_tst0,
            a_pu0,
            g0,
            r0,
            c_res,
        })
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    pub fn freq(&self) -> &DVector<f64> {
        &self.freq
    }

    /// `(min, max)` of the frequency grid.
    pub fn frequency_range(&self) -> (f64, f64) {
        (self.freq[0], self.freq[self.freq.len() - 1])
    }

    pub fn fc0(&self) -> Option<f64> {
        self.fc0
    }

    pub fn c0(&self) -> &TransferFunction {
        &self.c0
    }

    pub fn invc0(&self) -> &TransferFunction {
        &self.invc0
    }

    pub fn d0(&self) -> &TransferFunction {
        &self.d0
    }

    pub fn a_tst0(&self) -> &TransferFunction {
        &self.a_tst0
    }

    pub fn a_pu0(&self) -> &TransferFunction {
        &self.a_pu0
    }

    /// Reference open-loop gain `G0`.
    pub fn g0(&self) -> &TransferFunction {
        &self.g0
    }

    /// Reference response `R0`.
    pub fn r0(&self) -> &TransferFunction {
        &self.r0
    }

    /// `C0` with the cavity pole factored out (only when `fc0` was given).
    pub fn c_res(&self) -> Option<&TransferFunction> {
        self.c_res.as_ref()
    }

    /// Sensing function `C(f,t)` for the given `delta_fc` and `kappa_c`.
    pub fn update_sensing(&self, params: &CorrectionParams) -> Result<TransferFunction, CalError> {
        params.validate()?;
        let fc0 = self.fc0.ok_or(CalError::MissingReference("fc0"))?;
        let c_res = self.c_res.as_ref().ok_or(CalError::MissingReference("fc0"))?;

        let fc = fc0 + params.delta_fc;
        if fc == 0.0 {
            return Err(CalError::invalid(format!(
                "Shifted cavity pole fc0 + delta_fc is zero (fc0={fc0}, delta_fc={})",
                params.delta_fc
            )));
        }

        let kappa_c = params.kappa_c;
        Ok(c_res.zip_map(&self.freq, |c, f| c * kappa_c / pole_factor(f, fc)))
    }

    /// Total actuation `A_tst0 · κ_tst + A_pu0 · κ_pu`.
    pub fn update_actuation(&self, params: &CorrectionParams) -> Result<TransferFunction, CalError> {
        params.validate()?;
        let (kt, kp) = (params.kappa_tst, params.kappa_pu);
        Ok(self.a_tst0.zip_map(&self.a_pu0, |t, p| t * kt + p * kp))
    }

    /// Open-loop gain `G(f,t)`.
    pub fn update_gain(&self, params: &CorrectionParams) -> Result<TransferFunction, CalError> {
        let c = self.update_sensing(params)?;
        let a = self.update_actuation(params)?;
        Ok(open_loop_gain(&c, &self.d0, &a))
    }

    /// Response function `R(f,t)`.
    pub fn update_response(&self, params: &CorrectionParams) -> Result<TransferFunction, CalError> {
        Ok(self.transfer_functions(params)?.response)
    }

    /// Sensing, actuation, gain and response in one pass.
    pub fn transfer_functions(&self, params: &CorrectionParams) -> Result<TransferFunctions, CalError> {
        let sensing = self.update_sensing(params)?;
        let actuation = self.update_actuation(params)?;
        let gain = open_loop_gain(&sensing, &self.d0, &actuation);
        let response = response(&gain, &sensing);
        Ok(TransferFunctions {
            sensing,
            actuation,
            gain,
            response,
        })
    }

    /// Error function `K(f) = R(f,t) / R0(f)` on the model grid.
    pub fn response_ratio(&self, params: &CorrectionParams) -> Result<TransferFunction, CalError> {
        let r = self.update_response(params)?;
        Ok(r.component_div(&self.r0))
    }
}

/// `1 + i f / fc`
fn pole_factor(f: f64, fc: f64) -> Complex64 {
    Complex64::new(1.0, f / fc)
}

fn open_loop_gain(c: &TransferFunction, d: &TransferFunction, a: &TransferFunction) -> TransferFunction {
    c.component_mul(d).component_mul(a)
}

fn response(g: &TransferFunction, c: &TransferFunction) -> TransferFunction {
    g.map(|z| z + 1.0).component_div(c)
}

fn validate_grid(freq: &[f64]) -> Result<(), CalError> {
    if freq.is_empty() {
        return Err(CalError::invalid("Frequency grid is empty."));
    }
    if let Some(f) = freq.iter().find(|f| !f.is_finite()) {
        return Err(CalError::invalid(format!("Frequency grid contains a non-finite value ({f}).")));
    }
    if let Some(w) = freq.windows(2).find(|w| w[1] <= w[0]) {
        return Err(CalError::invalid(format!(
            "Frequency grid must be strictly increasing ({} Hz followed by {} Hz).",
            w[0], w[1]
        )));
    }
    Ok(())
}

fn check_len(name: &str, values: &[Complex64], n: usize) -> Result<(), CalError> {
    if values.len() != n {
        return Err(CalError::invalid(format!(
            "`{name}` has {} samples but the frequency grid has {n}.",
            values.len()
        )));
    }
    Ok(())
}

fn check_nonzero(name: &str, values: &[Complex64], freq: &[f64]) -> Result<(), CalError> {
    if let Some(i) = values.iter().position(|z| !z.is_finite() || z.norm() == 0.0) {
        return Err(CalError::invalid(format!(
            "`{name}` is zero or not finite at {} Hz; the sensing function must be invertible.",
            freq[i]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use approx::assert_abs_diff_eq;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn synthetic(fc0: Option<f64>) -> CalibrationModel {
        let mut inputs = CalibrationInputs::new(vec![1.0, 10.0, 100.0, 1000.0])
            .with_c0(vec![c(1.0); 4])
            .with_digital(vec![c(1.0); 4])
            .with_actuation(vec![c(0.5); 4], vec![c(0.5); 4]);
        inputs.fc0 = fc0;
        CalibrationModel::new(inputs).unwrap()
    }

    fn assert_close(a: &TransferFunction, b: &TransferFunction, eps: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = eps);
            assert_abs_diff_eq!(x.im, y.im, epsilon = eps);
        }
    }

    #[test]
    fn synthetic_reference_gain_and_response() {
        let model = synthetic(Some(100.0));
        assert_close(model.g0(), &DVector::from_element(4, c(1.0)), 1e-15);
        assert_close(model.r0(), &DVector::from_element(4, c(2.0)), 1e-15);
        assert_close(model.invc0(), &DVector::from_element(4, c(1.0)), 1e-15);
    }

    #[test]
    fn c_res_factors_out_the_pole() {
        let model = synthetic(Some(100.0));
        let c_res = model.c_res().unwrap();
        assert_abs_diff_eq!(c_res[2].re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(c_res[2].im, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(c_res[3].im, 10.0, epsilon = 1e-15);
    }

    #[test]
    fn identity_sensing_reproduces_c0() {
        let model = fixtures::model();
        let c = model.update_sensing(&CorrectionParams::identity()).unwrap();
        assert_close(&c, model.c0(), 1e-12);
    }

    #[test]
    fn identity_gain_and_response_reproduce_reference() {
        let model = fixtures::model();
        let id = CorrectionParams::identity();
        assert_close(&model.update_gain(&id).unwrap(), model.g0(), 1e-12);
        assert_close(&model.update_response(&id).unwrap(), model.r0(), 1e-10);

        let k = model.response_ratio(&id).unwrap();
        assert_close(&k, &DVector::from_element(model.len(), c(1.0)), 1e-12);
    }

    #[test]
    fn kappa_c_scales_sensing_exactly() {
        let model = synthetic(Some(100.0));
        let one = model.update_sensing(&CorrectionParams::identity()).unwrap();
        let two = model
            .update_sensing(&CorrectionParams::identity().with_kappa_c(2.0))
            .unwrap();
        for (a, b) in one.iter().zip(two.iter()) {
            assert_eq!(*b, *a * 2.0);
        }
    }

    #[test]
    fn delta_fc_moves_the_pole() {
        let model = synthetic(Some(100.0));
        let params = CorrectionParams::identity().with_delta_fc(-50.0);
        let c = model.update_sensing(&params).unwrap();
        // At f = 100 Hz: C = (1 + 1i) / (1 + 2i) = (3 - 1i) / 5
        assert_abs_diff_eq!(c[2].re, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(c[2].im, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn actuation_kappas_enter_the_gain() {
        let model = synthetic(Some(100.0));
        let params = CorrectionParams::identity()
            .with_kappa_tst(Complex64::new(2.0, 0.0))
            .with_kappa_pu(Complex64::new(0.0, 1.0));
        let g = model.update_gain(&params).unwrap();
        // C = 1, D = 1, A = 0.5·2 + 0.5·i
        assert_close(&g, &DVector::from_element(4, Complex64::new(1.0, 0.5)), 1e-12);

        let r = model.update_response(&params).unwrap();
        assert_close(&r, &DVector::from_element(4, Complex64::new(2.0, 0.5)), 1e-12);
    }

    #[test]
    fn updates_do_not_mutate_the_model() {
        let model = fixtures::model();
        let before = model.clone();
        let params = CorrectionParams::from_parts(5.0, 1.1, 0.9, 0.05, 1.2, -0.03);
        let first = model.update_response(&params).unwrap();
        let second = model.update_response(&params).unwrap();
        assert_eq!(first, second);
        assert_eq!(model, before);
    }

    #[test]
    fn sensing_without_fc0_is_missing_reference() {
        let model = synthetic(None);
        let err = model.update_sensing(&CorrectionParams::identity()).unwrap_err();
        assert_eq!(err, CalError::MissingReference("fc0"));
        assert!(matches!(
            model.update_response(&CorrectionParams::identity()),
            Err(CalError::MissingReference("fc0"))
        ));
        // Reference quantities are still available.
        assert_close(model.r0(), &DVector::from_element(4, c(2.0)), 1e-15);
    }

    #[test]
    fn zero_kappa_c_is_invalid_not_nan() {
        let model = fixtures::model();
        let params = CorrectionParams::identity().with_kappa_c(0.0);
        assert!(matches!(model.update_sensing(&params), Err(CalError::InvalidInput(_))));
        assert!(matches!(model.update_response(&params), Err(CalError::InvalidInput(_))));
        assert!(matches!(model.response_ratio(&params), Err(CalError::InvalidInput(_))));
    }

    #[test]
    fn construction_requires_a_sensing_function() {
        let inputs = CalibrationInputs::new(vec![1.0, 2.0])
            .with_digital(vec![c(1.0); 2])
            .with_actuation(vec![c(1.0); 2], vec![c(1.0); 2]);
        assert!(matches!(
            CalibrationModel::new(inputs.clone()),
            Err(CalError::InvalidInput(_))
        ));

        let both = inputs.with_c0(vec![c(1.0); 2]).with_invc0(vec![c(1.0); 2]);
        assert!(matches!(CalibrationModel::new(both), Err(CalError::InvalidInput(_))));
    }

    #[test]
    fn construction_rejects_length_mismatch() {
        let inputs = CalibrationInputs::new(vec![1.0, 2.0, 3.0])
            .with_c0(vec![c(1.0); 3])
            .with_digital(vec![c(1.0); 2])
            .with_actuation(vec![c(1.0); 3], vec![c(1.0); 3]);
        let err = CalibrationModel::new(inputs).unwrap_err();
        assert!(err.to_string().contains("d0"), "{err}");
    }

    #[test]
    fn construction_rejects_unsorted_grid_and_zero_pole() {
        let inputs = CalibrationInputs::new(vec![1.0, 3.0, 2.0])
            .with_c0(vec![c(1.0); 3])
            .with_digital(vec![c(1.0); 3])
            .with_actuation(vec![c(1.0); 3], vec![c(1.0); 3]);
        assert!(CalibrationModel::new(inputs).is_err());

        let inputs = CalibrationInputs::new(vec![1.0, 2.0])
            .with_fc0(0.0)
            .with_c0(vec![c(1.0); 2])
            .with_digital(vec![c(1.0); 2])
            .with_actuation(vec![c(1.0); 2], vec![c(1.0); 2]);
        assert!(CalibrationModel::new(inputs).is_err());
    }

    #[test]
    fn invc0_and_c0_build_the_same_model() {
        let from_c0 = fixtures::model();
        let invc0: Vec<Complex64> = from_c0.c0().iter().map(|z| z.inv()).collect();
        let from_inv = CalibrationModel::new(
            CalibrationInputs::new(from_c0.freq().as_slice().to_vec())
                .with_fc0(fixtures::FC0)
                .with_invc0(invc0)
                .with_digital(from_c0.d0().as_slice().to_vec())
                .with_actuation(
                    from_c0.a_tst0().as_slice().to_vec(),
                    from_c0.a_pu0().as_slice().to_vec(),
                ),
        )
        .unwrap();
        assert_close(from_inv.c0(), from_c0.c0(), 1e-12);
        assert_close(from_inv.r0(), from_c0.r0(), 1e-9);
    }

    #[test]
    fn complex_frequencies_keep_real_part() {
        let freq = [Complex64::new(1.0, 0.3), Complex64::new(2.0, 0.0)];
        let inputs = CalibrationInputs::with_complex_freq(&freq)
            .with_c0(vec![c(1.0); 2])
            .with_digital(vec![c(1.0); 2])
            .with_actuation(vec![c(1.0); 2], vec![c(1.0); 2]);
        let model = CalibrationModel::new(inputs).unwrap();
        assert_eq!(model.freq().as_slice(), &[1.0, 2.0]);
    }
}
