//! Central Configuration Constants
//!
//! Single source of truth for all analysis defaults.
//! Every value here can be overridden through the environment (see `config.rs`)
//! or the command line.

/// Number of repeated reference requests used to measure natural jitter
pub const DEFAULT_BASELINE_SAMPLES: usize = 10;

/// Decimal digits kept for similarity scores and the equivalence threshold
pub const SCORE_PRECISION: i32 = 3;

/// Bodies longer than this (in characters) are compared by length only
pub const DEFAULT_LENGTH_METRIC_LIMIT: usize = 10_000;

/// Wall-clock budget for one content-similarity computation (milliseconds)
pub const DEFAULT_METRIC_BUDGET_MS: u64 = 500;

/// HTTP timeout per request (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Redirects followed per request
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// User-Agent injected when the captured request carries none
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.141 Safari/537.36";

/// Header probed by the identity phase
pub const USER_AGENT_HEADER: &str = "user-agent";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "header-probe";

// ============================================
// Environment variable names
// ============================================

pub const ENV_SAMPLES: &str = "HEADER_PROBE_SAMPLES";
pub const ENV_TIMEOUT_SECS: &str = "HEADER_PROBE_TIMEOUT_SECS";
pub const ENV_EXPECTED_TEXT_ANOMALY: &str = "HEADER_PROBE_EXPECTED_TEXT_ANOMALY";
pub const ENV_LENGTH_LIMIT: &str = "HEADER_PROBE_LENGTH_LIMIT";
pub const ENV_METRIC_BUDGET_MS: &str = "HEADER_PROBE_METRIC_BUDGET_MS";
pub const ENV_OUTPUT_DIR: &str = "HEADER_PROBE_OUTPUT_DIR";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a numeric value from the environment or use the default
pub fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag from the environment ("1", "true", "yes", "on")
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Read an optional string from the environment, treating blank as unset
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
