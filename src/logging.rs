//! Log subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Logs go to stderr so CSV written to stdout stays clean.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Environment variable holding the default filter directive.
pub const LOG_ENV: &str = "CALSTRAIN_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Filter directive: the `--log-level` flag wins over `CALSTRAIN_LOG`.
pub fn filter_directive(flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| std::env::var(LOG_ENV).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(flag: Option<&str>) -> Result<(), AppError> {
    let directive = filter_directive(flag);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| AppError::new(2, format!("Invalid log filter '{directive}': {e}")))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_environment() {
        assert_eq!(filter_directive(Some("calstrain=debug")), "calstrain=debug");
        assert_eq!(filter_directive(Some(" warn ")), "warn");
    }
}
