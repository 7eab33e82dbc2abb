//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - correction parameters (`CorrectionParams`)
//! - the time/frequency series the adjuster works on (`TimeSeries`, `FrequencySeries`)
//! - run configuration and report types (`AdjustConfig`, `RunReport`, ...)

pub mod types;

pub use types::*;
