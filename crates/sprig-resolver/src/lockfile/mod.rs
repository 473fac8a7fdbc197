//! Lock file (sprig.lock) for reproducible installs
//!
//! A lock file freezes a successful resolution: every selected package with
//! the metadata needed to rebuild its spec, plus the installation order.
//! Loading it never re-runs resolution.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::types::{PackageSpec, ResolverContext, Version, VersionReq};
use sprig_core::utils::normalize_name;

use crate::resolver::ResolutionResult;
use crate::ResolverResult;

/// Current lock file format version
pub const LOCK_FORMAT_VERSION: &str = "1.0";

/// Lock file document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Lock file format version
    pub format_version: String,
    /// Runtime version the resolution targeted
    pub runtime_version: Option<String>,
    /// Platform version the resolution targeted
    pub platform_version: Option<String>,
    /// Locked packages in resolution order
    pub packages: IndexMap<String, LockedPackage>,
    /// Package names, dependencies before dependents
    pub installation_order: Vec<String>,
}

/// Locked package entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub version: Version,
    pub runtime_version_constraint: VersionReq,
    pub supported_platform_versions: BTreeSet<String>,
    pub dependencies: BTreeMap<String, VersionReq>,
    pub optional_dependencies: BTreeMap<String, BTreeMap<String, VersionReq>>,
    pub is_prerelease: bool,
}

impl LockFile {
    /// Freeze a successful resolution
    pub fn from_resolution(result: &ResolutionResult, context: &ResolverContext) -> ResolverResult<Self> {
        if !result.is_successful() {
            return Err(SprigError::UnsuccessfulResolution {
                conflicts: result.conflicts.len(),
            });
        }

        let packages = result
            .resolved_packages
            .iter()
            .map(|(name, spec)| (name.clone(), LockedPackage::from_spec(spec)))
            .collect();

        Ok(Self {
            format_version: LOCK_FORMAT_VERSION.to_string(),
            runtime_version: context.runtime_version.as_ref().map(Version::to_string),
            platform_version: context.platform_version.clone(),
            packages,
            installation_order: result.installation_order.clone(),
        })
    }

    /// Rebuild the resolution this lock file was created from
    pub fn into_resolution(self) -> ResolutionResult {
        let resolved_packages = self
            .packages
            .into_iter()
            .map(|(name, locked)| {
                let spec = locked.into_spec(&name);
                (name, spec)
            })
            .collect();

        ResolutionResult {
            resolved_packages,
            conflicts: Vec::new(),
            installation_order: self.installation_order,
        }
    }

    /// Accept any `1.x` format version
    pub fn check_format(format_version: &str) -> ResolverResult<()> {
        let mut parts = format_version.split('.');
        let major_ok = parts.next() == Some("1");
        let rest_ok = parts.all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));

        if major_ok && rest_ok {
            Ok(())
        } else {
            Err(SprigError::UnsupportedLockFormat {
                found: format_version.to_string(),
                supported: "1.x".to_string(),
            })
        }
    }

    /// Verify lock file integrity
    ///
    /// Package names must already be normalized and the installation order
    /// must name every locked package exactly once.
    pub fn verify(&self) -> ResolverResult<()> {
        Self::check_format(&self.format_version)?;

        if let Some(name) = self.packages.keys().find(|name| normalize_name(name) != **name) {
            return Err(integrity(format!(
                "Locked package name is not normalized: {} (expected {})",
                name,
                normalize_name(name)
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.installation_order {
            if !seen.insert(name.as_str()) {
                return Err(integrity(format!("Duplicate package in installation order: {}", name)));
            }
            if !self.packages.contains_key(name) {
                return Err(integrity(format!("Installation order names unlocked package: {}", name)));
            }
        }

        if let Some(missing) = self.packages.keys().find(|name| !seen.contains(name.as_str())) {
            return Err(integrity(format!("Locked package missing from installation order: {}", missing)));
        }

        Ok(())
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> ResolverResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SprigError::LockFileParse {
            message: e.to_string(),
        })
    }

    /// Parse lock file from JSON, checking the format version first
    pub fn from_json_str(content: &str) -> ResolverResult<Self> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(parse_error)?;

        let format_version = value
            .get("format_version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SprigError::LockFileParse {
                message: "missing field `format_version`".to_string(),
            })?;
        Self::check_format(format_version)?;

        let lock: LockFile = serde_json::from_value(value).map_err(parse_error)?;
        lock.verify()?;

        debug!(packages = lock.packages.len(), format = %lock.format_version, "Parsed lock file");
        Ok(lock)
    }

    /// Write lock file to disk
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> ResolverResult<()> {
        let path = path.as_ref();
        let content = self.to_json_string()?;
        std::fs::write(path, content)
            .map_err(|e| SprigError::io(format!("Failed to write lock file {}", path.display()), e))
    }

    /// Read lock file from disk
    pub fn read_from_file(path: impl AsRef<Path>) -> ResolverResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SprigError::io(format!("Failed to read lock file {}", path.display()), e))?;
        Self::from_json_str(&content)
    }
}

impl LockedPackage {
    /// Capture everything needed to rebuild the spec
    pub fn from_spec(spec: &PackageSpec) -> Self {
        Self {
            version: spec.version().clone(),
            runtime_version_constraint: spec.runtime_version_constraint().clone(),
            supported_platform_versions: spec.supported_platform_versions().clone(),
            dependencies: spec.dependencies().clone(),
            optional_dependencies: spec.optional_dependencies().clone(),
            is_prerelease: spec.is_prerelease(),
        }
    }

    /// Rebuild the spec under `name`
    pub fn into_spec(self, name: &str) -> PackageSpec {
        let mut spec = PackageSpec::new(name, self.version)
            .with_runtime_constraint(self.runtime_version_constraint)
            .with_platforms(self.supported_platform_versions)
            .with_prerelease(self.is_prerelease);

        for (dependency, constraint) in self.dependencies {
            spec = spec.with_dependency(&dependency, constraint);
        }
        for (extra, dependencies) in self.optional_dependencies {
            for (dependency, constraint) in dependencies {
                spec = spec.with_optional_dependency(&extra, &dependency, constraint);
            }
        }

        spec
    }
}

fn parse_error(err: serde_json::Error) -> SprigError {
    SprigError::LockFileParse {
        message: err.to_string(),
    }
}

fn integrity(message: String) -> SprigError {
    SprigError::LockFileParse { message }
}
