//! # sprig-core
//!
//! Core types and utilities shared across all sprig crates.
//!
//! This crate provides:
//! - Version and VersionReq types with a typed constraint AST
//! - PackageSpec and Requirement types consumed by the resolver
//! - ResolverContext describing the target runtime and platform
//! - SprigError enum for unified error handling
//! - Package name normalization
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, PackageSpec, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{SprigError, SprigResult};
pub use types::{
    DependencyKind, PackageSpec, Requirement, ResolverContext, Version, VersionError, VersionReq,
};
pub use utils::name::normalize_name;
