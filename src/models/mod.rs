//! Calibration model: reference transfer functions of one epoch and their
//! time-dependent updates.
//!
//! The model is immutable once built; updates are pure functions of the
//! reference arrays and a `CorrectionParams` set.

pub mod calibration;

#[cfg(test)]
pub(crate) mod fixtures;

pub use calibration::*;
