//! In-memory package registry
//!
//! Holds every known version of every package plus the currently installed
//! version of each package. Populated before resolution; resolution only reads.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use sprig_core::types::{PackageSpec, Version};
use sprig_core::utils::normalize_name;

/// Known and installed package versions for one resolution session
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    /// name -> version -> spec, versions kept in ascending order
    available: HashMap<String, BTreeMap<Version, PackageSpec>>,
    /// name -> installed spec (at most one version per name)
    installed: HashMap<String, PackageSpec>,
}

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of distinct package names
    pub packages: usize,
    /// Number of registered versions across all packages
    pub versions: usize,
    /// Number of installed packages
    pub installed: usize,
}

impl PackageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an available version, returning the spec it replaced
    pub fn add_package(&mut self, spec: PackageSpec) -> Option<PackageSpec> {
        debug!(package = %spec.id(), "Registering available package");
        self.available
            .entry(spec.name().to_string())
            .or_default()
            .insert(spec.version().clone(), spec)
    }

    /// Record the installed version of a package.
    ///
    /// The installed version also becomes available if it was not already
    /// registered, so it can be selected.
    pub fn add_installed_package(&mut self, spec: PackageSpec) -> Option<PackageSpec> {
        debug!(package = %spec.id(), "Registering installed package");
        let versions = self.available.entry(spec.name().to_string()).or_default();
        versions
            .entry(spec.version().clone())
            .or_insert_with(|| spec.clone());

        self.installed.insert(spec.name().to_string(), spec)
    }

    /// All registered versions of a package, ascending
    pub fn versions(&self, name: &str) -> Option<&BTreeMap<Version, PackageSpec>> {
        self.available.get(&normalize_name(name))
    }

    /// One specific registered version
    pub fn get(&self, name: &str, version: &Version) -> Option<&PackageSpec> {
        self.versions(name)?.get(version)
    }

    /// Installed version of a package, if any
    pub fn installed(&self, name: &str) -> Option<&PackageSpec> {
        self.installed.get(&normalize_name(name))
    }

    /// Check if any version of a package is known
    pub fn contains(&self, name: &str) -> bool {
        self.versions(name).map_or(false, |versions| !versions.is_empty())
    }

    /// Number of distinct package names
    pub fn package_count(&self) -> usize {
        self.available.len()
    }

    /// Number of registered versions across all packages
    pub fn version_count(&self) -> usize {
        self.available.values().map(BTreeMap::len).sum()
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            packages: self.package_count(),
            versions: self.version_count(),
            installed: self.installed.len(),
        }
    }
}
