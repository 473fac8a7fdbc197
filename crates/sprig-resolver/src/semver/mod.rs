//! Compatible-version selection
//!
//! Filters the registered versions of one package by constraint, runtime,
//! platform and prerelease policy, and explains why nothing matched when the
//! filtered list comes back empty.

use std::collections::BTreeMap;

use sprig_core::types::{PackageSpec, ResolverContext, Version, VersionReq};

use crate::compat::{platform_ok, runtime_ok};

/// Version selector over the registered versions of a single package
#[derive(Debug, Clone, Copy)]
pub struct VersionSelector<'a> {
    /// Registered versions in ascending order, `None` if the name is unknown
    available: Option<&'a BTreeMap<Version, PackageSpec>>,
    /// Target runtime/platform and policies
    context: &'a ResolverContext,
}

/// Why no candidate survived the filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionFailure {
    /// The package has no registered versions at all
    NotFound,
    /// No registered version satisfies the constraint
    Unsatisfiable { available: Vec<Version> },
    /// Only prerelease versions satisfy the constraint and prereleases are disallowed
    PrereleaseOnly { prereleases: Vec<Version> },
    /// Versions satisfy the constraint but none supports the target runtime
    RuntimeIncompatible { rejected: Vec<Version> },
    /// Versions satisfy the constraint and runtime but none supports the target platform
    PlatformIncompatible { rejected: Vec<Version> },
}

impl<'a> VersionSelector<'a> {
    /// Create new version selector with available versions
    pub fn new(available: Option<&'a BTreeMap<Version, PackageSpec>>, context: &'a ResolverContext) -> Self {
        Self { available, context }
    }

    fn specs(&self) -> impl DoubleEndedIterator<Item = &'a PackageSpec> {
        self.available.into_iter().flat_map(|versions| versions.values())
    }

    fn prerelease_ok(&self, spec: &PackageSpec) -> bool {
        self.context.allow_prerelease || !spec.is_prerelease()
    }

    /// All versions passing every filter, newest first
    pub fn compatible(&self, constraint: &VersionReq) -> Vec<&'a PackageSpec> {
        self.specs()
            .rev() // Start with highest versions
            .filter(|spec| constraint.matches(spec.version()))
            .filter(|spec| runtime_ok(spec, self.context))
            .filter(|spec| platform_ok(spec, self.context))
            .filter(|spec| self.prerelease_ok(spec))
            .collect()
    }

    /// Select the version to install.
    ///
    /// With prefer-installed enabled, an installed version that is itself a
    /// compatible candidate wins; otherwise the newest candidate does.
    pub fn select(
        &self,
        constraint: &VersionReq,
        installed: Option<&Version>,
    ) -> Result<&'a PackageSpec, SelectionFailure> {
        let candidates = self.compatible(constraint);

        let preferred = installed
            .filter(|_| self.context.prefer_installed)
            .and_then(|installed| candidates.iter().find(|spec| spec.version() == installed));

        match preferred.or_else(|| candidates.first()) {
            Some(spec) => Ok(*spec),
            None => Err(self.explain(constraint)),
        }
    }

    /// Classify why no candidate matches.
    ///
    /// Compatibility failures are only reported when the constraint and
    /// prerelease policy alone would have left candidates.
    pub fn explain(&self, constraint: &VersionReq) -> SelectionFailure {
        if self.specs().next().is_none() {
            return SelectionFailure::NotFound;
        }

        let satisfying: Vec<&PackageSpec> = self
            .specs()
            .filter(|spec| constraint.matches(spec.version()))
            .collect();
        if satisfying.is_empty() {
            return SelectionFailure::Unsatisfiable {
                available: self.specs().map(|spec| spec.version().clone()).collect(),
            };
        }

        let allowed: Vec<&PackageSpec> = satisfying
            .iter()
            .copied()
            .filter(|spec| self.prerelease_ok(spec))
            .collect();
        if allowed.is_empty() {
            return SelectionFailure::PrereleaseOnly {
                prereleases: versions_of(&satisfying),
            };
        }

        if !allowed.iter().any(|spec| runtime_ok(spec, self.context)) {
            return SelectionFailure::RuntimeIncompatible {
                rejected: versions_of(&allowed),
            };
        }

        SelectionFailure::PlatformIncompatible {
            rejected: versions_of(&allowed),
        }
    }

    /// Get the highest available version
    pub fn highest_version(&self) -> Option<&'a Version> {
        self.specs().next_back().map(PackageSpec::version)
    }

    /// Get the lowest available version
    pub fn lowest_version(&self) -> Option<&'a Version> {
        self.specs().next().map(PackageSpec::version)
    }

    /// Check if any version passes every filter
    pub fn has_matching(&self, constraint: &VersionReq) -> bool {
        !self.compatible(constraint).is_empty()
    }
}

fn versions_of(specs: &[&PackageSpec]) -> Vec<Version> {
    specs.iter().map(|spec| spec.version().clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(s: &str) -> VersionReq {
        VersionReq::parse(s).unwrap()
    }

    fn create_versions() -> BTreeMap<Version, PackageSpec> {
        ["1.0.0", "1.1.0", "1.2.0", "2.0.0-alpha.1", "2.0.0", "2.1.0"]
            .into_iter()
            .map(|v| {
                let spec = PackageSpec::parse("pkg", v).unwrap();
                (spec.version().clone(), spec)
            })
            .collect()
    }

    fn versions(specs: &[&PackageSpec]) -> Vec<String> {
        specs.iter().map(|s| s.version().to_string()).collect()
    }

    #[test]
    fn test_compatible_newest_first() {
        let available = create_versions();
        let context = ResolverContext::new();
        let selector = VersionSelector::new(Some(&available), &context);

        let matching = selector.compatible(&req(">=1.0.0,<2.0.0"));
        assert_eq!(versions(&matching), ["1.2.0", "1.1.0", "1.0.0"]);
    }

    #[test]
    fn test_prereleases_excluded_by_default() {
        let available = create_versions();
        let context = ResolverContext::new();
        let selector = VersionSelector::new(Some(&available), &context);
        assert_eq!(versions(&selector.compatible(&req(">=2.0.0-alpha,<2.1.0"))), ["2.0.0"]);

        let context = ResolverContext::new().allow_prerelease(true);
        let selector = VersionSelector::new(Some(&available), &context);
        assert_eq!(
            versions(&selector.compatible(&req(">=2.0.0-alpha.0,<2.1.0"))),
            ["2.0.0", "2.0.0-alpha.1"]
        );
    }

    #[test]
    fn test_wildcard_matches_everything_compatible() {
        let available = create_versions();
        let context = ResolverContext::new();
        let selector = VersionSelector::new(Some(&available), &context);

        assert_eq!(selector.compatible(&req("*")).len(), 5);
    }

    #[test]
    fn test_select_prefers_installed_only_when_enabled() {
        let available = create_versions();
        let installed = Version::new(1, 1, 0);

        let context = ResolverContext::new();
        let selector = VersionSelector::new(Some(&available), &context);
        let selected = selector.select(&req(">=1.0.0"), Some(&installed)).unwrap();
        assert_eq!(selected.version(), &Version::new(2, 1, 0));

        let context = ResolverContext::new().prefer_installed(true);
        let selector = VersionSelector::new(Some(&available), &context);
        let selected = selector.select(&req(">=1.0.0"), Some(&installed)).unwrap();
        assert_eq!(selected.version(), &installed);

        // Installed version outside the constraint is ignored
        let selected = selector.select(&req(">=2.0.0"), Some(&installed)).unwrap();
        assert_eq!(selected.version(), &Version::new(2, 1, 0));
    }

    #[test]
    fn test_explain_not_found_and_unsatisfiable() {
        let context = ResolverContext::new();
        let selector = VersionSelector::new(None, &context);
        assert_eq!(selector.select(&req("*"), None).unwrap_err(), SelectionFailure::NotFound);

        let available = create_versions();
        let selector = VersionSelector::new(Some(&available), &context);
        assert!(matches!(
            selector.explain(&req(">=3.0.0")),
            SelectionFailure::Unsatisfiable { available } if available.len() == 6
        ));
        assert!(matches!(
            selector.explain(&req("==2.0.0-alpha.1")),
            SelectionFailure::PrereleaseOnly { .. }
        ));
    }

    #[test]
    fn test_explain_compatibility_failures() {
        let mut available = BTreeMap::new();
        let spec = PackageSpec::parse("pkg", "1.0.0")
            .unwrap()
            .with_runtime_constraint(req(">=3.11"))
            .with_platforms(["2024"]);
        available.insert(spec.version().clone(), spec);

        let context = ResolverContext::new().with_runtime_version(Version::parse("3.9").unwrap());
        let selector = VersionSelector::new(Some(&available), &context);
        assert!(matches!(
            selector.explain(&req("*")),
            SelectionFailure::RuntimeIncompatible { .. }
        ));

        let context = ResolverContext::new()
            .with_runtime_version(Version::parse("3.11").unwrap())
            .with_platform_version("2022");
        let selector = VersionSelector::new(Some(&available), &context);
        assert!(matches!(
            selector.explain(&req("*")),
            SelectionFailure::PlatformIncompatible { .. }
        ));
    }

    #[test]
    fn test_highest_lowest_version() {
        let available = create_versions();
        let context = ResolverContext::new();
        let selector = VersionSelector::new(Some(&available), &context);

        assert_eq!(selector.highest_version(), Some(&Version::new(2, 1, 0)));
        assert_eq!(selector.lowest_version(), Some(&Version::new(1, 0, 0)));
        assert!(selector.has_matching(&req("^1.0.0")));
        assert!(!selector.has_matching(&req("^3.0.0")));
    }
}
