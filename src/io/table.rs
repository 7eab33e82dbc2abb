//! Measured transfer-function tables.
//!
//! One row per frequency: `frequency re(H) im(H)`, separated by whitespace
//! and/or commas. Blank lines and lines starting with `#` or `%` are skipped,
//! as is anything after a `#` on a data line. Extra columns are ignored.

use std::fs;
use std::path::Path;

use num_complex::Complex64;

use crate::error::{AppError, CalError};

/// A transfer function `H(f)` as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferTable {
    pub freq: Vec<f64>,
    pub values: Vec<Complex64>,
}

impl TransferTable {
    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// True when both tables sample the same frequencies (relative 1e-9).
    pub fn same_grid(&self, other: &TransferTable) -> bool {
        self.freq.len() == other.freq.len()
            && self
                .freq
                .iter()
                .zip(&other.freq)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }
}

/// Parse table text. `source` only labels error messages.
pub fn parse_transfer_table(text: &str, source: &str) -> Result<TransferTable, CalError> {
    let mut freq = Vec::new();
    let mut values = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();
        if fields.len() < 3 {
            return Err(CalError::invalid(format!(
                "{source}:{line_no}: expected `frequency re im`, found {} column(s).",
                fields.len()
            )));
        }

        let mut nums = [0.0_f64; 3];
        for (slot, field) in nums.iter_mut().zip(&fields) {
            *slot = field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CalError::invalid(format!("{source}:{line_no}: invalid number '{field}'.")))?;
        }

        freq.push(nums[0]);
        values.push(Complex64::new(nums[1], nums[2]));
    }

    if freq.is_empty() {
        return Err(CalError::invalid(format!("{source}: no data rows.")));
    }

    Ok(TransferTable { freq, values })
}

/// Read and parse a table file.
pub fn read_transfer_table(path: &Path) -> Result<TransferTable, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read table '{}': {e}", path.display())))?;
    Ok(parse_transfer_table(&text, &path.display().to_string())?)
}
