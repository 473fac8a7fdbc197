//! Dependency resolution engine for sprig
//!
//! Given root requirements and an in-memory registry of package versions, this
//! crate picks one version per package, reports every conflict it finds, orders
//! the result for installation and round-trips successful resolutions through a
//! lock file.

pub mod compat;
pub mod conflict;
pub mod graph;
pub mod lockfile;
pub mod registry;
pub mod resolver;
pub mod semver;

// Re-export main types
pub use compat::{is_compatible_with_platform, is_compatible_with_runtime};
pub use conflict::{ConflictType, DependencyConflict};
pub use graph::{DependencyEdge, DependencyGraph, GraphError, PackageId};
pub use lockfile::{LockFile, LockedPackage, LOCK_FORMAT_VERSION};
pub use registry::{PackageRegistry, RegistryStats};
pub use resolver::{ExtrasMap, ResolutionResult, Resolver};
pub use semver::{SelectionFailure, VersionSelector};

use sprig_core::error::SprigError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, SprigError>;
