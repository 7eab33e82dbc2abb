//! Parallel parameter sweeps.
//!
//! Each adjustment is independent given its inputs (the model is read-only),
//! so a sweep over many parameter sets is an embarrassingly parallel map. Every
//! rayon worker owns its own `StrainAdjuster` (and plan cache) via `map_init`.

use rayon::prelude::*;
use tracing::info;

use crate::domain::{CorrectionParams, TimeSeries};
use crate::error::CalError;
use crate::models::CalibrationModel;

use super::strain::{AdjustOptions, StrainAdjuster};

/// Result of adjusting the strain for one parameter set.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub params: CorrectionParams,
    pub result: Result<TimeSeries, CalError>,
}

impl SweepOutcome {
    /// `rms(adjusted - input) / rms(input)`, if the adjustment succeeded.
    pub fn relative_change(&self, input: &TimeSeries) -> Option<f64> {
        let adjusted = self.result.as_ref().ok()?;
        relative_rms_change(input, adjusted)
    }
}

/// Values to sweep per parameter. An empty axis means "identity only".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepAxes {
    pub delta_fc: Vec<f64>,
    pub kappa_c: Vec<f64>,
    pub kappa_tst_re: Vec<f64>,
    pub kappa_tst_im: Vec<f64>,
    pub kappa_pu_re: Vec<f64>,
    pub kappa_pu_im: Vec<f64>,
}

/// Cartesian product of the axes, `delta_fc` varying slowest.
pub fn grid(axes: &SweepAxes) -> Vec<CorrectionParams> {
    let id = CorrectionParams::identity();
    let or_identity = |values: &[f64], identity: f64| -> Vec<f64> {
        if values.is_empty() {
            vec![identity]
        } else {
            values.to_vec()
        }
    };

    let delta_fc = or_identity(&axes.delta_fc, id.delta_fc);
    let kappa_c = or_identity(&axes.kappa_c, id.kappa_c);
    let tst_re = or_identity(&axes.kappa_tst_re, id.kappa_tst.re);
    let tst_im = or_identity(&axes.kappa_tst_im, id.kappa_tst.im);
    let pu_re = or_identity(&axes.kappa_pu_re, id.kappa_pu.re);
    let pu_im = or_identity(&axes.kappa_pu_im, id.kappa_pu.im);

    let mut out = Vec::with_capacity(
        delta_fc.len() * kappa_c.len() * tst_re.len() * tst_im.len() * pu_re.len() * pu_im.len(),
    );
    for &dfc in &delta_fc {
        for &kc in &kappa_c {
            for &tr in &tst_re {
                for &ti in &tst_im {
                    for &pr in &pu_re {
                        for &pi in &pu_im {
                            out.push(CorrectionParams::from_parts(dfc, kc, tr, ti, pr, pi));
                        }
                    }
                }
            }
        }
    }
    out
}

/// Adjust `strain` once per parameter set, in parallel. Output order matches
/// `params`.
pub fn run_sweep(
    strain: &TimeSeries,
    model: &CalibrationModel,
    params: &[CorrectionParams],
    options: AdjustOptions,
) -> Vec<SweepOutcome> {
    info!(runs = params.len(), samples = strain.len(), "starting parameter sweep");
    params
        .par_iter()
        .map_init(
            || StrainAdjuster::new(model, options),
            |adjuster, p| SweepOutcome {
                params: *p,
                result: adjuster.adjust(strain, p),
            },
        )
        .collect()
}

pub fn relative_rms_change(input: &TimeSeries, adjusted: &TimeSeries) -> Option<f64> {
    if input.len() != adjusted.len() || input.is_empty() {
        return None;
    }
    let base = input.rms();
    if base == 0.0 {
        return None;
    }
    let ss: f64 = input
        .data
        .iter()
        .zip(&adjusted.data)
        .map(|(a, b)| (b - a) * (b - a))
        .sum();
    Some((ss / input.len() as f64).sqrt() / base)
}
