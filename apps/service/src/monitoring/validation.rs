//! Validation of monitor definitions before they are stored.

use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::database::models::NewMonitor;

/// Longest accepted polling interval (24 hours)
pub const MAX_INTERVAL_SECONDS: u64 = 86_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Monitor name cannot be empty")]
    EmptyName,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid scheme '{0}'. Must be http or https")]
    UnsupportedScheme(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Check interval too short: {actual} seconds (minimum: {min})")]
    IntervalTooShort { actual: u64, min: u64 },

    #[error("Check interval too long: {actual} seconds (maximum: {max})")]
    IntervalTooLong { actual: u64, max: u64 },
}

/// Validate a full monitor definition
pub fn validate_monitor(
    monitor: &NewMonitor,
    min_interval_seconds: u64,
) -> Result<(), ValidationError> {
    if monitor.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    validate_http_target(&monitor.url)?;
    validate_method(&monitor.method)?;
    for (name, value) in &monitor.headers {
        validate_header(name, value)?;
    }
    validate_check_interval(monitor.interval_seconds, min_interval_seconds)
}

/// Validate HTTP/HTTPS target
pub fn validate_http_target(target: &str) -> Result<(), ValidationError> {
    if target.trim().is_empty() {
        return Err(ValidationError::InvalidUrl("target cannot be empty".to_string()));
    }

    let url = Url::parse(target).map_err(|e| {
        if target.contains("://") {
            ValidationError::InvalidUrl(e.to_string())
        } else {
            ValidationError::InvalidUrl("URL must include scheme (http:// or https://)".to_string())
        }
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("URL must have a valid host".to_string()));
    }

    Ok(())
}

/// Only the standard request methods are accepted
pub fn validate_method(method: &str) -> Result<(), ValidationError> {
    let parsed = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| ValidationError::UnsupportedMethod(method.to_string()))?;

    let allowed = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
    ];

    if allowed.contains(&parsed) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMethod(method.to_string()))
    }
}

pub fn validate_header(name: &str, value: &str) -> Result<(), ValidationError> {
    if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
        return Err(ValidationError::InvalidHeader(name.to_string()));
    }
    Ok(())
}

/// Validate check interval against the configured floor
pub fn validate_check_interval(
    interval_seconds: u64,
    min_interval_seconds: u64,
) -> Result<(), ValidationError> {
    if interval_seconds < min_interval_seconds {
        return Err(ValidationError::IntervalTooShort {
            actual: interval_seconds,
            min: min_interval_seconds,
        });
    }

    if interval_seconds > MAX_INTERVAL_SECONDS {
        return Err(ValidationError::IntervalTooLong {
            actual: interval_seconds,
            max: MAX_INTERVAL_SECONDS,
        });
    }

    Ok(())
}
