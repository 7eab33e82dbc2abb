//! Error types.
//!
//! - `CalError` is the library error returned by the calibration model, the
//!   strain adjuster and the file loaders.
//! - `AppError` is what the binary reports: a message plus the process exit
//!   code. Every `CalError` converts into one.

/// Errors raised by the calibration core and its loaders.
#[derive(Debug, Clone, PartialEq)]
pub enum CalError {
    /// Caller-supplied data is malformed or inconsistent (missing sensing
    /// function, mismatched array lengths, bad grids/tables/series).
    InvalidInput(String),
    /// A reference quantity needed by the operation was not supplied when the
    /// model was built (e.g. the cavity pole `fc0`).
    MissingReference(&'static str),
    /// The correction was requested at a frequency outside the reference grid.
    ValueGrid { freq: f64, min: f64, max: f64 },
    /// The spectral engine rejected its buffers.
    Transform(String),
}

impl CalError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CalError::InvalidInput(message.into())
    }
}

impl std::fmt::Display for CalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            CalError::MissingReference(what) => {
                write!(f, "Missing reference value `{what}`: it was not supplied when the model was built.")
            }
            CalError::ValueGrid { freq, min, max } => write!(
                f,
                "Frequency {freq} Hz lies outside the calibration grid [{min}, {max}] Hz; refusing to extrapolate."
            ),
            CalError::Transform(msg) => write!(f, "Spectral transform failed: {msg}"),
        }
    }
}

impl std::error::Error for CalError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<CalError> for AppError {
    fn from(err: CalError) -> Self {
        let exit_code = match err {
            CalError::InvalidInput(_) | CalError::MissingReference(_) => 2,
            CalError::ValueGrid { .. } => 3,
            CalError::Transform(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cal_errors_map_to_exit_codes() {
        assert_eq!(AppError::from(CalError::invalid("x")).exit_code(), 2);
        assert_eq!(AppError::from(CalError::MissingReference("fc0")).exit_code(), 2);
        let grid = CalError::ValueGrid {
            freq: 2048.0,
            min: 1.0,
            max: 1000.0,
        };
        assert_eq!(AppError::from(grid).exit_code(), 3);
        assert_eq!(AppError::from(CalError::Transform("len".into())).exit_code(), 4);
    }

    #[test]
    fn missing_reference_names_the_value() {
        let msg = CalError::MissingReference("fc0").to_string();
        assert!(msg.contains("fc0"), "{msg}");
    }
}
