//! Input/output helpers.
//!
//! - transfer-function tables (`table`)
//! - JSON model manifests -> `CalibrationModel` (`manifest`)
//! - strain CSV read/write (`strain`)
//! - response CSV and run-report JSON (`export`)

pub mod export;
pub mod manifest;
pub mod strain;
pub mod table;

pub use export::*;
pub use manifest::*;
pub use strain::*;
pub use table::*;
