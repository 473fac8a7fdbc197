//! Configuration for sprig
//!
//! This crate parses and validates sprig.toml project manifests, layers
//! environment and command-line overrides on top of them, and installs the
//! tracing subscriber used by front-ends.

pub mod logging;
pub mod merge;
pub mod toml;

// Re-export main types
pub use logging::{setup_logging, LogFormat};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use self::toml::{DependencySpec, ProjectSection, ResolverSettings, SprigToml};

use sprig_core::error::SprigError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SprigError>;
