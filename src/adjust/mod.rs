//! Strain adjustment.
//!
//! - `strain`: the single-run adjuster (`StrainAdjuster`, `adjust_strain`)
//! - `sweep`: many parameter sets over the same strain, in parallel

pub mod strain;
pub mod sweep;

pub use strain::*;
pub use sweep::*;
