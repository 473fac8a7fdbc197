//! Package specification types.
//!
//! A `PackageSpec` is one concrete version of one package as handed over by
//! the registry metadata collaborator: its declared dependencies, optional
//! extras and the runtime/platform versions it supports.

use std::collections::{BTreeMap, BTreeSet};

use super::{Version, VersionError, VersionReq};
use crate::utils::normalize_name;

/// One concrete version of one package.
///
/// Names are normalized on construction. Once built, a spec is only ever
/// shared by reference; resolution selects specs but never edits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    name: String,
    version: Version,
    runtime_version_constraint: VersionReq,
    supported_platform_versions: BTreeSet<String>,
    dependencies: BTreeMap<String, VersionReq>,
    optional_dependencies: BTreeMap<String, BTreeMap<String, VersionReq>>,
    is_prerelease: bool,
}

impl PackageSpec {
    /// Create a spec with no dependencies that runs everywhere
    pub fn new(name: &str, version: Version) -> Self {
        let is_prerelease = version.is_prerelease();
        Self {
            name: normalize_name(name),
            version,
            runtime_version_constraint: VersionReq::any(),
            supported_platform_versions: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            optional_dependencies: BTreeMap::new(),
            is_prerelease,
        }
    }

    /// Create a spec from a version string
    pub fn parse(name: &str, version: &str) -> Result<Self, VersionError> {
        Ok(Self::new(name, version.parse()?))
    }

    /// Restrict the runtime versions this package works with
    pub fn with_runtime_constraint(mut self, constraint: VersionReq) -> Self {
        self.runtime_version_constraint = constraint;
        self
    }

    /// Declare the platform versions this package supports
    pub fn with_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_platform_versions
            .extend(platforms.into_iter().map(|p| p.into().trim().to_string()));
        self
    }

    /// Add a required dependency
    pub fn with_dependency(mut self, name: &str, constraint: VersionReq) -> Self {
        self.dependencies.insert(normalize_name(name), constraint);
        self
    }

    /// Add a dependency that is only installed when `extra` is requested
    pub fn with_optional_dependency(mut self, extra: &str, name: &str, constraint: VersionReq) -> Self {
        self.optional_dependencies
            .entry(normalize_name(extra))
            .or_default()
            .insert(normalize_name(name), constraint);
        self
    }

    /// Override the prerelease flag derived from the version
    pub fn with_prerelease(mut self, is_prerelease: bool) -> Self {
        self.is_prerelease = is_prerelease;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn runtime_version_constraint(&self) -> &VersionReq {
        &self.runtime_version_constraint
    }

    pub fn supported_platform_versions(&self) -> &BTreeSet<String> {
        &self.supported_platform_versions
    }

    pub fn dependencies(&self) -> &BTreeMap<String, VersionReq> {
        &self.dependencies
    }

    pub fn optional_dependencies(&self) -> &BTreeMap<String, BTreeMap<String, VersionReq>> {
        &self.optional_dependencies
    }

    pub fn is_prerelease(&self) -> bool {
        self.is_prerelease
    }

    /// Dependencies activated by one extra group, if the package declares it
    pub fn extra(&self, extra: &str) -> Option<&BTreeMap<String, VersionReq>> {
        self.optional_dependencies.get(&normalize_name(extra))
    }

    /// Identity key `name@version`
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
