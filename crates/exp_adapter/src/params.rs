//! Helpers for the `key=value` parameter convention the service evaluates
//! when choosing which experience to return.
//!
//! The wire format is a flat list of strings like `route_distance=399`;
//! the injected `callbackid=` parameter uses the same convention.

use crate::error::{ExperienceError, Result};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Format a single `key=value` parameter.
///
/// Keys must be non-empty and free of `=` and whitespace — the service
/// splits on the first `=` and would silently misparse anything else.
pub fn pair(key: &str, value: impl Display) -> Result<String> {
    validate_key(key)?;
    Ok(format!("{key}={value}"))
}

/// Format a set of pairs in deterministic (key-sorted) order.
pub fn pairs(entries: &BTreeMap<String, String>) -> Result<Vec<String>> {
    entries.iter().map(|(k, v)| pair(k, v)).collect()
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ExperienceError::InvalidParam("key cannot be empty".into()));
    }
    if key.contains('=') {
        return Err(ExperienceError::InvalidParam(format!(
            "key '{key}' cannot contain '='"
        )));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(ExperienceError::InvalidParam(format!(
            "key '{key}' cannot contain whitespace"
        )));
    }
    Ok(())
}
