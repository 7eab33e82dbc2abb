//! Mathematical utilities: phase unwrapping, degree-1 splines and
//! transfer-function error helpers.

pub mod phase;
pub mod spline;
pub mod transfer;

pub use phase::*;
pub use spline::*;
pub use transfer::*;
