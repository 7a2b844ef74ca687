//! Structured logging setup via tracing-subscriber.
//!
//! - `NIDAA_LOG_LEVEL`: filter directive (trace/debug/info/warn/error), default info
//! - `NIDAA_LOG_FORMAT`: `text` or `json`, default text

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Returns `false` if one was already set.
///
/// `NIDAA_LOG_LEVEL` wins over `level`; an unknown `level` means info.
pub fn init_logging(level: &str) -> bool {
    let fallback = if log_level_valid(level) { level } else { "info" };
    let filter = EnvFilter::try_from_env("NIDAA_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    let format = std::env::var("NIDAA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let result = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    result.is_ok()
}

/// Whether a level string is one we document.
pub fn log_level_valid(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}
