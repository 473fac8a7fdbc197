//! Typed resolution conflicts
//!
//! Conflicts are the recoverable tier of failure: they never abort resolution,
//! they accumulate on the result so a caller can fix every problem in one pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of conflict found during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// No single version satisfies every constraint on a package
    VersionConflict,
    /// A package depends on itself through its dependencies
    CircularDependency,
    /// A required package is not registered at all
    MissingDependency,
    /// Matching versions exist but none supports the target platform
    PlatformIncompatible,
    /// Matching versions exist but none supports the target runtime
    RuntimeIncompatible,
}

/// Conflict error when dependencies cannot be satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{conflict_type}: {message}")]
pub struct DependencyConflict {
    /// Kind of conflict
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    /// Package the conflict is about
    pub package_name: String,
    /// Versions and constraints involved (`name@version` ids, `name constraint`
    /// requirements, or the cycle path)
    pub conflicting_specs: Vec<String>,
    /// Human-readable explanation
    pub message: String,
}

impl ConflictType {
    /// Critical conflicts can never be forced past.
    ///
    /// Platform and runtime incompatibilities still fail resolution but are
    /// not critical, so strict callers can allow forced installs past them.
    pub fn is_critical(&self) -> bool {
        matches!(self, ConflictType::VersionConflict | ConflictType::CircularDependency)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::VersionConflict => "VERSION_CONFLICT",
            ConflictType::CircularDependency => "CIRCULAR_DEPENDENCY",
            ConflictType::MissingDependency => "MISSING_DEPENDENCY",
            ConflictType::PlatformIncompatible => "PLATFORM_INCOMPATIBLE",
            ConflictType::RuntimeIncompatible => "RUNTIME_INCOMPATIBLE",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DependencyConflict {
    /// Create a new conflict
    pub fn new(
        conflict_type: ConflictType,
        package_name: impl Into<String>,
        conflicting_specs: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            package_name: package_name.into(),
            conflicting_specs,
            message: message.into(),
        }
    }

    /// Cycle through `path`, where the last entry repeats an earlier one
    pub fn circular(path: Vec<String>) -> Self {
        let package_name = path.last().cloned().unwrap_or_default();
        let message = format!("Circular dependency detected: {}", path.join(" -> "));
        Self::new(ConflictType::CircularDependency, package_name, path, message)
    }

    /// Check if this conflict is critical
    pub fn is_critical(&self) -> bool {
        self.conflict_type.is_critical()
    }

    /// Get a user-friendly suggestion for fixing this conflict
    pub fn suggestion(&self) -> &'static str {
        match self.conflict_type {
            ConflictType::VersionConflict => "Relax one of the constraints or pin a version that satisfies all of them",
            ConflictType::CircularDependency => "Remove circular dependencies by restructuring your packages",
            ConflictType::MissingDependency => "Check the package name spelling or register the package metadata",
            ConflictType::PlatformIncompatible => "Pick a package version that supports the target platform",
            ConflictType::RuntimeIncompatible => "Pick a package version that supports the target runtime",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_classification() {
        assert!(ConflictType::VersionConflict.is_critical());
        assert!(ConflictType::CircularDependency.is_critical());
        assert!(!ConflictType::MissingDependency.is_critical());
        assert!(!ConflictType::PlatformIncompatible.is_critical());
        assert!(!ConflictType::RuntimeIncompatible.is_critical());
    }

    #[test]
    fn test_circular_conflict_display() {
        let conflict = DependencyConflict::circular(vec!["a".into(), "b".into(), "c".into(), "a".into()]);

        assert_eq!(conflict.conflict_type, ConflictType::CircularDependency);
        assert_eq!(conflict.package_name, "a");
        let msg = conflict.to_string();
        assert!(msg.starts_with("CIRCULAR_DEPENDENCY"));
        assert!(msg.contains("a -> b -> c -> a"));
    }

    #[test]
    fn test_serializes_type_tag() {
        let conflict = DependencyConflict::new(
            ConflictType::MissingDependency,
            "ghost",
            vec!["ghost >=1.0.0".to_string()],
            "Package 'ghost' was not found",
        );

        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["type"], "MISSING_DEPENDENCY");
        assert_eq!(json["package_name"], "ghost");
    }
}
