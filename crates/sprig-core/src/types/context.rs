//! Resolution context.
//!
//! The target environment and policies a resolver is constructed with.

use super::Version;

/// Target runtime/platform and selection policies for one resolution session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolverContext {
    /// Host runtime version checked against each package's runtime constraint.
    /// `None` skips the runtime filter.
    pub runtime_version: Option<Version>,
    /// Host platform identifier (e.g. an application release). `None` skips
    /// the platform filter.
    pub platform_version: Option<String>,
    /// Allow versions flagged as prerelease
    pub allow_prerelease: bool,
    /// Keep an installed version when it satisfies the constraint
    pub prefer_installed: bool,
}

impl ResolverContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime_version(mut self, version: Version) -> Self {
        self.runtime_version = Some(version);
        self
    }

    pub fn with_platform_version(mut self, platform: impl Into<String>) -> Self {
        self.platform_version = Some(platform.into().trim().to_string());
        self
    }

    pub fn allow_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn prefer_installed(mut self, prefer: bool) -> Self {
        self.prefer_installed = prefer;
        self
    }
}
