//! `calstrain` library crate.
//!
//! Re-calibrates gravitational-wave strain for time-dependent changes in the
//! detector's calibration: a `models::CalibrationModel` holds the reference
//! transfer functions, `adjust::StrainAdjuster` applies the resulting
//! correction to strain in the frequency domain.
//!
//! The binary (`calstrain`) is a thin wrapper around this library so the core
//! stays testable without spawning processes.

pub mod adjust;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
pub mod spectral;
