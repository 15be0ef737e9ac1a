//! Environment-backed configuration for the experience stack.
//!
//! Every value has a default suitable for local development; set the
//! corresponding variable to override. Statics are read once, on first
//! access.

use lazy_static::lazy_static;

lazy_static! {
    /// Base URL of the personalization service (outbound define/update
    /// calls). `EXP_SERVICE_URL`.
    pub static ref SERVICE_URL: String = env_or("EXP_SERVICE_URL", "http://localhost:9090");

    /// Bind address for the gate. `EXP_GATE_ADDR`.
    pub static ref GATE_ADDR: String = env_or("EXP_GATE_ADDR", "0.0.0.0:3000");

    /// How long an issued request waits for its resolve callback, in
    /// milliseconds. `EXP_RESOLVE_TIMEOUT_MS`.
    pub static ref RESOLVE_TIMEOUT_MS: u64 = env_u64("EXP_RESOLVE_TIMEOUT_MS", 10_000);
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
