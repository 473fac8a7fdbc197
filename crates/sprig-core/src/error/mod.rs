//! Error types and result aliases for sprig operations.
//!
//! Only fatal conditions live here: malformed input, usage errors and I/O.
//! Dependency situations that can be reported back to the caller (missing
//! packages, version conflicts, cycles) are conflicts on the resolution
//! result, not errors.

use thiserror::Error;

use crate::types::VersionError;

/// Unified error type for all sprig operations
#[derive(Error, Debug)]
pub enum SprigError {
    // Version and constraint syntax
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("Invalid constraint '{constraint}' for {package}: {reason}")]
    InvalidConstraint {
        package: String,
        constraint: String,
        reason: String,
    },

    #[error("Invalid package name '{name}'")]
    InvalidPackageName { name: String },

    // Lock file errors
    #[error("Cannot create lock file: resolution was unsuccessful ({conflicts} conflicts)")]
    UnsuccessfulResolution { conflicts: usize },

    #[error("Failed to parse lock file: {message}")]
    LockFileParse { message: String },

    #[error("Unsupported lock file format version {found} (supported: {supported})")]
    UnsupportedLockFormat { found: String, supported: String },

    // Config errors
    #[error("Failed to parse sprig.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for sprig operations
pub type SprigResult<T> = Result<T, SprigError>;

impl SprigError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Attach the offending package and constraint text to a constraint parse failure
    pub fn constraint(package: &str, constraint: &str, source: VersionError) -> Self {
        Self::InvalidConstraint {
            package: package.to_string(),
            constraint: constraint.to_string(),
            reason: source.to_string(),
        }
    }

    /// Create a config validation error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SprigError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SprigError::InvalidConstraint { .. } => {
                Some("Use comma-separated comparators such as '>=1.0.0,<2.0.0'")
            },
            SprigError::UnsuccessfulResolution { .. } => {
                Some("Fix the reported conflicts before writing a lock file")
            },
            SprigError::UnsupportedLockFormat { .. } => {
                Some("Regenerate the lock file with this version of sprig")
            },
            SprigError::LockFileParse { .. } => Some("Delete the lock file and resolve again"),
            _ => None,
        }
    }
}
