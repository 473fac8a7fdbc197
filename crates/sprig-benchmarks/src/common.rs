//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use sprig_core::types::{PackageSpec, ResolverContext, Version, VersionReq};
use sprig_resolver::Resolver;

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Name of the `index`-th synthetic package
pub fn package_name(index: usize) -> String {
    format!("pkg-{}", index)
}

/// Registry of `package_count` packages with `versions_per_package` versions
/// each. Package `i` depends on up to `fan_out` packages with higher indices,
/// so the graph is a DAG rooted at `pkg-0`.
pub fn layered_resolver(package_count: usize, versions_per_package: u64, fan_out: usize) -> Resolver {
    let mut resolver = Resolver::new(ResolverContext::new());

    for index in 0..package_count {
        for minor in 0..versions_per_package {
            let mut spec = PackageSpec::new(&package_name(index), Version::new(1, minor, 0));
            for step in 1..=fan_out {
                let dependency = index * fan_out + step;
                if dependency < package_count {
                    spec = spec.with_dependency(&package_name(dependency), caret(1, minor / 2));
                }
            }
            resolver.register_package(spec);
        }
    }

    resolver
}

/// Registry where every package depends on one shared package with a
/// disjoint range, so resolution reports a conflict per dependent
pub fn conflicting_resolver(dependent_count: usize) -> Resolver {
    let mut resolver = Resolver::new(ResolverContext::new());
    resolver.register_package(PackageSpec::new("shared", Version::new(1, 0, 0)));
    resolver.register_package(PackageSpec::new("shared", Version::new(2, 0, 0)));

    for index in 0..dependent_count {
        let major = if index % 2 == 0 { 1 } else { 2 };
        resolver.register_package(
            PackageSpec::new(&package_name(index), Version::new(1, 0, 0))
                .with_dependency("shared", caret(major, 0)),
        );
    }

    resolver
}

/// Version strings `0.0.0` upwards, with every tenth one a prerelease
pub fn version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let base = format!("{}.{}.{}", i / 100, (i / 10) % 10, i % 10);
            if i % 10 == 9 {
                format!("{}-rc.{}", base, i % 3)
            } else {
                base
            }
        })
        .collect()
}

/// Mix of constraint syntaxes
pub fn constraint_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 6 {
            0 => format!("^{}.{}", i % 5, i % 7),
            1 => format!("~{}.{}.{}", i % 5, i % 7, i % 3),
            2 => format!(">={}.0.0,<{}.0.0", i % 5, i % 5 + 1),
            3 => format!("=={}.{}.*", i % 5, i % 7),
            4 => format!("~={}.{}", i % 5, i % 7),
            _ => "*".to_string(),
        })
        .collect()
}

fn caret(major: u64, minor: u64) -> VersionReq {
    VersionReq::parse(&format!("^{}.{}", major, minor)).unwrap_or_default()
}
