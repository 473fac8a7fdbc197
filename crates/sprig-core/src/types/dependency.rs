//! Dependency specification types.
//!
//! Defines root requirements handed to the resolver and the kinds of edges
//! recorded in the resolved dependency graph.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::VersionReq;
use crate::error::{SprigError, SprigResult};
use crate::utils::normalize_name;

/// A root requirement: package name, constraint and requested extras
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub constraint: VersionReq,
    pub extras: BTreeSet<String>,
}

/// Type of dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Always installed with the dependent
    Required,
    /// Installed because the named extra was requested
    Extra(String),
}

impl Requirement {
    /// Create a requirement with no extras
    pub fn new(name: &str, constraint: VersionReq) -> Self {
        Self {
            name: normalize_name(name),
            constraint,
            extras: BTreeSet::new(),
        }
    }

    /// Parse the constraint text; blank names and malformed constraints are fatal.
    ///
    /// Any other name is accepted as spelled, an unknown one surfaces later as
    /// a missing dependency.
    pub fn parse(name: &str, constraint: &str) -> SprigResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SprigError::InvalidPackageName {
                name: name.to_string(),
            });
        }
        let req = VersionReq::parse(constraint)
            .map_err(|e| SprigError::constraint(name, constraint, e))?;
        Ok(Self::new(name, req))
    }

    /// Request an extra group of the package
    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extras.insert(normalize_name(extra));
        self
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        write!(f, " {}", self.constraint)
    }
}

impl DependencyKind {
    /// Check if this dependency was pulled in through an extra
    pub fn is_optional(&self) -> bool {
        matches!(self, DependencyKind::Extra(_))
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Required => f.write_str("required"),
            DependencyKind::Extra(extra) => write!(f, "extra '{}'", extra),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_creation() {
        let requirement = Requirement::parse("Py_Revit", ">=1.0.0,<2.0.0").unwrap();

        assert_eq!(requirement.name, "py-revit");
        assert_eq!(requirement.constraint.to_string(), ">=1.0.0,<2.0.0");
        assert!(requirement.extras.is_empty());
    }

    #[test]
    fn test_requirement_with_extras() {
        let requirement = Requirement::parse("charts", "^2.1")
            .unwrap()
            .with_extra("Excel")
            .with_extra("pdf");

        assert!(requirement.extras.contains("excel"));
        assert_eq!(requirement.to_string(), "charts[excel,pdf] ^2.1");
    }

    #[test]
    fn test_malformed_requirement_is_fatal() {
        let err = Requirement::parse("charts", ">>2").unwrap_err();
        assert!(matches!(err, SprigError::InvalidConstraint { .. }));

        let err = Requirement::parse("  ", "*").unwrap_err();
        assert!(matches!(err, SprigError::InvalidPackageName { .. }));
    }

    #[test]
    fn test_unusual_names_are_accepted() {
        let requirement = Requirement::parse("_private", "*").unwrap();
        assert_eq!(requirement.name, "-private");

        let requirement = Requirement::parse(" Trimmed.Name ", "*").unwrap();
        assert_eq!(requirement.name, "trimmed-name");
    }

    #[test]
    fn test_dependency_kinds() {
        assert!(!DependencyKind::Required.is_optional());
        assert!(DependencyKind::Extra("pdf".to_string()).is_optional());
        assert_eq!(DependencyKind::Extra("pdf".to_string()).to_string(), "extra 'pdf'");
    }
}
