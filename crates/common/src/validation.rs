//! Input validation for externally supplied camera attributes.
//!
//! Every string that reaches the engine from configuration or an API caller
//! passes through here first, so unbounded input and shell metacharacters
//! are rejected before they can reach a probe subprocess or a log line.

use anyhow::{anyhow, Result};

/// Maximum length for camera and strategy names
pub const MAX_NAME_LENGTH: usize = 100;

/// Minimum length for camera names
pub const MIN_NAME_LENGTH: usize = 2;

/// Maximum length for URIs (RTSP, HTTP, device paths)
pub const MAX_URI_LENGTH: usize = 4096;

/// Maximum length for address/location strings
pub const MAX_ADDRESS_LENGTH: usize = 512;

/// Validate string length against a maximum
pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

/// Validate non-empty string
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Validate a display name (camera name, zone name)
pub fn validate_name(name: &str, field_name: &str) -> Result<()> {
    validate_non_empty(name, field_name)?;
    if name.len() < MIN_NAME_LENGTH {
        return Err(anyhow!(
            "{} must be at least {} characters (got {})",
            field_name,
            MIN_NAME_LENGTH,
            name.len()
        ));
    }
    validate_length(name, MAX_NAME_LENGTH, field_name)?;
    Ok(())
}

/// Validate a URI or device path before it is handed to a probe.
///
/// Rejects shell metacharacters so URIs can safely appear in subprocess
/// arguments (ffmpeg snapshot grabs).
pub fn validate_uri(uri: &str, field_name: &str) -> Result<()> {
    validate_non_empty(uri, field_name)?;
    validate_length(uri, MAX_URI_LENGTH, field_name)?;

    let dangerous_chars = ['`', '$', ';', '|', '\n', '\r'];
    if uri.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!(
            "{} contains dangerous shell metacharacters",
            field_name
        ));
    }

    Ok(())
}

/// Validate port number (1-65535)
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(anyhow!("Port number must be between 1 and 65535, got 0"));
    }
    Ok(())
}

/// Validate value is within range
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: T,
    max: T,
    field_name: &str,
) -> Result<()> {
    if value < min || value > max {
        return Err(anyhow!(
            "{} must be between {} and {}, got {}",
            field_name,
            min,
            max,
            value
        ));
    }
    Ok(())
}
