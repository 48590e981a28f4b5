//! Validation of user-supplied identifiers.
//!
//! Feature ids and repository names end up as path segments under the
//! features directory and as branch name components, so they are restricted
//! to a conservative character set before anything touches disk or git.

use anyhow::{bail, Result};

/// Maximum allowed length for feature ids and repository names.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum allowed length for feature display names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Names that cannot be used as path segments (case-insensitive).
const RESERVED_NAMES: &[&str] = &[
    ".", "..", "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Validates that an identifier is safe as a path segment and branch component.
///
/// Allowed: ASCII alphanumerics, `-`, `_` and `.` (repository names such as
/// `web.app` are common), not starting with `.` or `-`, not a reserved name.
///
/// # Examples
///
/// ```
/// use weft::validation::validate_id;
///
/// assert!(validate_id("feat-001").is_ok());
/// assert!(validate_id("web.app").is_ok());
/// assert!(validate_id("../etc").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("ID cannot be empty");
    }

    if id.len() > MAX_ID_LENGTH {
        bail!("ID too long: {} characters (max {MAX_ID_LENGTH})", id.len());
    }

    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid_chars {
        bail!("ID '{id}' contains invalid characters. Use only alphanumeric characters, dashes (-), underscores (_) and dots (.)");
    }

    if id.starts_with('.') || id.starts_with('-') {
        bail!("ID '{id}' must not start with '.' or '-'");
    }

    if id.contains("..") || id.ends_with(".lock") {
        bail!("ID '{id}' is not a valid git branch component");
    }

    if RESERVED_NAMES.contains(&id.to_lowercase().as_str()) {
        bail!("ID '{id}' uses a reserved name");
    }

    Ok(())
}

/// Validates a feature's display name: non-blank and of reasonable length.
pub fn validate_feature_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Feature name cannot be empty");
    }

    if name.len() > MAX_NAME_LENGTH {
        bail!(
            "Feature name too long: {} characters (max {MAX_NAME_LENGTH})",
            name.len()
        );
    }

    Ok(())
}

/// Clap value parser for id arguments
pub fn clap_id_validator(s: &str) -> Result<String, String> {
    validate_id(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Clap value parser for feature names
pub fn clap_name_validator(s: &str) -> Result<String, String> {
    validate_feature_name(s).map_err(|e| e.to_string())?;
    Ok(s.trim().to_string())
}
