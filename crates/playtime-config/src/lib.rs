//! Configuration parsing and validation for playtime
//!
//! Supports JSON configuration with:
//! - Weekday and weekend/holiday daily limits
//! - Holiday dates
//! - Activity labels
//! - Network time server settings
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a JSON string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = serde_json::from_str(content)?;

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Load configuration, never failing.
///
/// A missing file yields the defaults and is not created. An unreadable or
/// malformed file is logged and also yields the defaults. Fields of the
/// wrong type and validation problems are logged, and the offending fields
/// fall back individually.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Policy {
    let path = path.as_ref();

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file, using defaults");
            return Policy::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
            return Policy::default();
        }
    };

    let raw = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => RawConfig::from_json_lenient(&value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
            return Policy::default();
        }
    };

    for error in validate_config(&raw) {
        warn!(path = %path.display(), error = %error, "Config problem");
    }

    Policy::from_raw(raw)
}
