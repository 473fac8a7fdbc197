//! Core data types for sprig dependency resolution.
//!
//! This module provides the fundamental types used throughout the sprig crates:
//! - Version types and typed constraints
//! - Package specifications
//! - Root requirements and dependency kinds
//! - The resolution context

pub mod context;
pub mod dependency;
pub mod package;
pub mod version;

// Re-export all public types
pub use context::ResolverContext;
pub use dependency::{DependencyKind, Requirement};
pub use package::PackageSpec;
pub use version::{Comparator, Op, PartialVersion, Version, VersionError, VersionReq};
