//! Data sources that are not files on disk.

pub mod synth;

pub use synth::*;
