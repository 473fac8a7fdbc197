//! Runtime and platform compatibility predicates.

use sprig_core::types::{PackageSpec, ResolverContext, Version};

/// A package with no declared platforms runs on every platform
pub fn is_compatible_with_platform(spec: &PackageSpec, platform_version: &str) -> bool {
    let platforms = spec.supported_platform_versions();
    platforms.is_empty() || platforms.contains(platform_version.trim())
}

/// The runtime version must satisfy every clause of the package's constraint
pub fn is_compatible_with_runtime(spec: &PackageSpec, runtime_version: &Version) -> bool {
    spec.runtime_version_constraint().matches(runtime_version)
}

/// Runtime check against the context; no target runtime means no filtering
pub(crate) fn runtime_ok(spec: &PackageSpec, context: &ResolverContext) -> bool {
    context
        .runtime_version
        .as_ref()
        .map_or(true, |runtime| is_compatible_with_runtime(spec, runtime))
}

/// Platform check against the context; no target platform means no filtering
pub(crate) fn platform_ok(spec: &PackageSpec, context: &ResolverContext) -> bool {
    context
        .platform_version
        .as_deref()
        .map_or(true, |platform| is_compatible_with_platform(spec, platform))
}
