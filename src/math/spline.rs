//! Degree-1 interpolating spline.
//!
//! With zero smoothing a degree-1 spline is the piecewise-linear curve through
//! every node, which is what `interp1d` evaluates inside the fitted domain.
//!
//! Evaluation outside `[x_0, x_{n-1}]` is refused by default
//! (`GridPolicy::Strict`); linear continuation of the end segments far from the
//! fitted domain is rarely meaningful for a phase curve.

use interp1d::Interp1d;

use crate::domain::GridPolicy;
use crate::error::CalError;

/// Relative slack for evaluation at the grid ends (rounding at Nyquist etc.).
const EDGE_RTOL: f64 = 1e-9;

/// Straight line through one end segment, used only by `GridPolicy::Extrapolate`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EndSegment {
    x: f64,
    y: f64,
    slope: f64,
}

impl EndSegment {
    fn through(x: [f64; 2], y: [f64; 2], anchor: usize) -> Self {
        Self {
            x: x[anchor],
            y: y[anchor],
            slope: (y[1] - y[0]) / (x[1] - x[0]),
        }
    }

    fn at(&self, x: f64) -> f64 {
        self.y + self.slope * (x - self.x)
    }
}

pub struct LinearSpline {
    interp: Interp1d<f64, f64>,
    lo: EndSegment,
    hi: EndSegment,
}

impl std::fmt::Debug for LinearSpline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearSpline")
            .field("domain", &self.domain())
            .finish_non_exhaustive()
    }
}

impl LinearSpline {
    /// Fit through `(knots[i], values[i])`.
    ///
    /// Knots must be finite and strictly increasing, with at least two nodes.
    pub fn fit(knots: &[f64], values: &[f64]) -> Result<Self, CalError> {
        if knots.len() != values.len() {
            return Err(CalError::invalid(format!(
                "Spline knots ({}) and values ({}) differ in length.",
                knots.len(),
                values.len()
            )));
        }
        let n = knots.len();
        if n < 2 {
            return Err(CalError::invalid("A degree-1 spline needs at least two nodes."));
        }
        if knots.iter().chain(values).any(|v| !v.is_finite()) {
            return Err(CalError::invalid("Spline nodes must be finite."));
        }
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CalError::invalid("Spline knots must be strictly increasing."));
        }

        let lo = EndSegment::through([knots[0], knots[1]], [values[0], values[1]], 0);
        let hi = EndSegment::through([knots[n - 2], knots[n - 1]], [values[n - 2], values[n - 1]], 1);
        let interp = Interp1d::new_sorted(knots.to_vec(), values.to_vec())
            .map_err(|_| CalError::invalid("Spline knots could not be interpolated."))?;

        Ok(Self { interp, lo, hi })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.lo.x, self.hi.x)
    }

    /// True when `x` lies inside the fitted domain (with edge slack).
    pub fn covers(&self, x: f64) -> bool {
        let (lo, hi) = self.domain();
        let slack = EDGE_RTOL * lo.abs().max(hi.abs()).max(1.0);
        x >= lo - slack && x <= hi + slack
    }

    /// Evaluate at `x`.
    pub fn eval(&self, x: f64, policy: GridPolicy) -> Result<f64, CalError> {
        let (lo, hi) = self.domain();
        if self.covers(x) {
            // Inside the slack the end node value stands in.
            return Ok(self.interp.interpolate(x.clamp(lo, hi)));
        }
        match policy {
            GridPolicy::Strict => Err(CalError::ValueGrid { freq: x, min: lo, max: hi }),
            GridPolicy::Extrapolate if x < lo => Ok(self.lo.at(x)),
            GridPolicy::Extrapolate => Ok(self.hi.at(x)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spline() -> LinearSpline {
        LinearSpline::fit(&[0.0, 1.0, 3.0, 4.0], &[0.0, 2.0, -2.0, 5.0]).unwrap()
    }

    #[test]
    fn passes_through_every_node() {
        let s = spline();
        for (x, y) in [(0.0, 0.0), (1.0, 2.0), (3.0, -2.0), (4.0, 5.0)] {
            assert_abs_diff_eq!(s.eval(x, GridPolicy::Strict).unwrap(), y, epsilon = 1e-12);
        }
    }

    #[test]
    fn interpolates_linearly_between_nodes() {
        let s = spline();
        assert_abs_diff_eq!(s.eval(0.5, GridPolicy::Strict).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.eval(2.0, GridPolicy::Strict).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.eval(3.5, GridPolicy::Strict).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn strict_policy_rejects_out_of_range() {
        let s = spline();
        let err = s.eval(4.5, GridPolicy::Strict).unwrap_err();
        assert_eq!(
            err,
            CalError::ValueGrid {
                freq: 4.5,
                min: 0.0,
                max: 4.0
            }
        );
        assert!(s.eval(-0.1, GridPolicy::Strict).is_err());
    }

    #[test]
    fn edge_rounding_is_tolerated() {
        let s = spline();
        let v = s.eval(4.0 + 1e-12, GridPolicy::Strict).unwrap();
        assert_abs_diff_eq!(v, 5.0, epsilon = 1e-9);
        let v = s.eval(-1e-12, GridPolicy::Strict).unwrap();
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn extrapolate_policy_continues_end_segments() {
        let s = spline();
        assert_abs_diff_eq!(s.eval(5.0, GridPolicy::Extrapolate).unwrap(), 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.eval(-1.0, GridPolicy::Extrapolate).unwrap(), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn fit_rejects_bad_knots() {
        assert!(LinearSpline::fit(&[0.0], &[1.0]).is_err());
        assert!(LinearSpline::fit(&[0.0, 0.0], &[1.0, 2.0]).is_err());
        assert!(LinearSpline::fit(&[0.0, 1.0], &[1.0]).is_err());
        assert!(LinearSpline::fit(&[0.0, f64::NAN], &[1.0, 2.0]).is_err());
    }
}
