//! Strain time series as CSV (`time,strain`).
//!
//! GPS time stamps are ~1e9 s, where an `f64` resolves only ~2e-7 s. Stamps
//! are therefore handled as whole seconds plus a fractional part, so the
//! inferred sample spacing is not limited by that resolution.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;

use crate::domain::TimeSeries;
use crate::error::{AppError, CalError};

/// Largest allowed distance of a stamp from the uniform grid, in samples.
const SAMPLING_TOLERANCE: f64 = 1e-3;

/// Parse a strain CSV from any reader.
pub fn read_strain<R: Read>(reader: R) -> Result<TimeSeries, CalError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| CalError::invalid(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let (Some(&time_col), Some(&strain_col)) = (header_map.get("time"), header_map.get("strain")) else {
        return Err(CalError::invalid("Strain CSV needs `time` and `strain` columns."));
    };

    let mut stamps = Vec::new();
    let mut data = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| CalError::invalid(format!("line {line}: CSV parse error: {e}")))?;
        let raw = field(&record, time_col, "time", line)?;
        stamps.push(
            parse_stamp(raw)
                .ok_or_else(|| CalError::invalid(format!("line {line}: invalid `time` value '{raw}'.")))?,
        );
        data.push(parse_value(&record, strain_col, "strain", line)?);
    }

    let n = stamps.len();
    if n < 2 {
        return Err(CalError::invalid(format!(
            "Strain CSV needs at least two samples to infer the sampling, found {n}."
        )));
    }

    let (w0, f0) = stamps[0];
    let offset = |&(w, f): &(i64, f64)| (w - w0) as f64 + (f - f0);
    let delta_t = offset(&stamps[n - 1]) / (n - 1) as f64;
    if !(delta_t.is_finite() && delta_t > 0.0) {
        return Err(CalError::invalid("Strain time stamps must be strictly increasing."));
    }
    for (i, stamp) in stamps.iter().enumerate() {
        let dev = offset(stamp) - i as f64 * delta_t;
        if dev.abs() > SAMPLING_TOLERANCE * delta_t {
            return Err(CalError::invalid(format!(
                "Strain is not uniformly sampled: line {} is {dev:+e} s off the grid.",
                i + 2
            )));
        }
    }

    let start = w0 as f64 + f0;
    TimeSeries::new(data, delta_t, start)
}

pub fn read_strain_csv(path: &Path) -> Result<TimeSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open strain CSV '{}': {e}", path.display())))?;
    read_strain(file).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))
}

pub fn write_strain<W: Write>(writer: W, series: &TimeSeries) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["time", "strain"])?;
    let whole = series.start_time.trunc();
    let frac = series.start_time - whole;
    for (i, x) in series.data.iter().enumerate() {
        let stamp = format_stamp(whole as i64, frac + i as f64 * series.delta_t);
        w.write_record([stamp, x.to_string()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_strain_csv(path: &Path, series: &TimeSeries) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create strain CSV '{}': {e}", path.display())))?;
    write_strain(file, series)
        .map_err(|e| AppError::new(4, format!("Failed to write strain CSV '{}': {e}", path.display())))
}

fn field<'r>(record: &'r StringRecord, col: usize, name: &str, line: usize) -> Result<&'r str, CalError> {
    record
        .get(col)
        .ok_or_else(|| CalError::invalid(format!("line {line}: missing `{name}` value.")))
}

fn parse_value(record: &StringRecord, col: usize, name: &str, line: usize) -> Result<f64, CalError> {
    let raw = field(record, col, name, line)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CalError::invalid(format!("line {line}: invalid `{name}` value '{raw}'.")))
}

/// `(whole seconds, fraction)` of a time stamp; both carry the stamp's sign.
fn parse_stamp(raw: &str) -> Option<(i64, f64)> {
    let (neg, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if !int.is_empty() && int.len() <= 15 && digits(int) && digits(frac) {
        let whole: i64 = int.parse().ok()?;
        let frac: f64 = if frac.is_empty() {
            0.0
        } else {
            format!("0.{frac}").parse().ok()?
        };
        return Some(if neg { (-whole, -frac) } else { (whole, frac) });
    }

    // Exponent notation and the like.
    let v: f64 = raw.parse().ok().filter(|v: &f64| v.is_finite() && v.abs() < 1e15)?;
    let whole = v.trunc();
    Some((whole as i64, v - whole))
}

/// `whole + offset` with nanosecond resolution.
fn format_stamp(whole: i64, offset: f64) -> String {
    const NS: i64 = 1_000_000_000;
    let total = whole * NS + (offset * 1e9).round() as i64;
    let (sign, magnitude) = if total < 0 { ("-", -total) } else { ("", total) };
    format!("{sign}{}.{:09}", magnitude / NS, magnitude % NS)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}
