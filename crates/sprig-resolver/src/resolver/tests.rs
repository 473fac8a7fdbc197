use super::*;
use sprig_core::error::SprigError;

fn req(s: &str) -> VersionReq {
    VersionReq::parse(s).unwrap()
}

fn spec(name: &str, version: &str, dependencies: &[(&str, &str)]) -> PackageSpec {
    dependencies
        .iter()
        .fold(PackageSpec::parse(name, version).unwrap(), |spec, (dep, constraint)| {
            spec.with_dependency(dep, req(constraint))
        })
}

fn resolver_with(specs: Vec<PackageSpec>) -> Resolver {
    with_context(specs, ResolverContext::new())
}

fn with_context(specs: Vec<PackageSpec>, context: ResolverContext) -> Resolver {
    let mut resolver = Resolver::new(context);
    for spec in specs {
        resolver.register_package(spec);
    }
    resolver
}

fn resolve(resolver: &Resolver, requirements: &[(&str, &str)]) -> ResolutionResult {
    resolver
        .resolve_dependencies(requirements.iter().copied(), &ExtrasMap::new())
        .unwrap()
}

fn version_of(result: &ResolutionResult, name: &str) -> String {
    result.get(name).unwrap().version().to_string()
}

fn position(result: &ResolutionResult, name: &str) -> usize {
    result.installation_order.iter().position(|n| n == name).unwrap()
}

#[test]
fn test_single_package_without_dependencies() {
    let resolver = resolver_with(vec![spec("pkg", "1.0.0", &[])]);

    let result = resolve(&resolver, &[("pkg", ">=1.0.0")]);

    assert!(result.is_successful());
    assert_eq!(result.resolved_packages.len(), 1);
    assert_eq!(version_of(&result, "pkg"), "1.0.0");
    assert_eq!(result.installation_order, ["pkg"]);
}

#[test]
fn test_selects_newest_compatible_version() {
    let specs = ["1.0.0", "1.1.0", "1.2.0", "2.0.0", "2.1.0"]
        .into_iter()
        .map(|v| spec("pkg", v, &[]))
        .collect();
    let resolver = resolver_with(specs);

    let result = resolve(&resolver, &[("pkg", ">=1.0.0,<2.0.0")]);

    assert!(result.is_successful());
    assert_eq!(version_of(&result, "pkg"), "1.2.0");
}

#[test]
fn test_diamond_resolves_shared_dependency_once() {
    let resolver = resolver_with(vec![
        spec("a", "1.0.0", &[("b", "^1.0"), ("c", "^1.0")]),
        spec("b", "1.0.0", &[("d", ">=1.0.0")]),
        spec("c", "1.0.0", &[("d", "<2.0.0")]),
        spec("d", "1.0.0", &[]),
    ]);

    let result = resolve(&resolver, &[("a", "*")]);

    assert!(result.is_successful());
    assert_eq!(result.resolved_packages.len(), 4);
    assert_eq!(result.installation_order.iter().filter(|n| *n == "d").count(), 1);
    assert!(position(&result, "d") < position(&result, "b"));
    assert!(position(&result, "d") < position(&result, "c"));
    assert!(position(&result, "b") < position(&result, "a"));
    assert!(position(&result, "c") < position(&result, "a"));
    assert_eq!(result.installation_order, ["d", "b", "c", "a"]);
}

#[test]
fn test_missing_dependency() {
    let resolver = resolver_with(vec![spec("app", "1.0.0", &[("ghost", ">=1.0")])]);

    let result = resolve(&resolver, &[("app", "*")]);

    assert!(!result.is_successful());
    assert_eq!(result.conflicts.len(), 1);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::MissingDependency);
    assert_eq!(conflict.package_name, "ghost");
    assert!(conflict.message.contains("app@1.0.0"));
    assert!(result.critical_conflicts().is_empty());
}

#[test]
fn test_disjoint_ranges_produce_version_conflict() {
    let resolver = resolver_with(vec![
        spec("x", "1.0.0", &[("shared", "<2.0.0")]),
        spec("y", "1.0.0", &[("shared", ">=2.0.0")]),
        spec("shared", "1.0.0", &[]),
        spec("shared", "2.0.0", &[]),
    ]);

    let result = resolve(&resolver, &[("x", "*"), ("y", "*")]);

    assert!(!result.is_successful());
    let conflicts = result.conflicts_of(ConflictType::VersionConflict);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].package_name, "shared");
    assert!(conflicts[0].conflicting_specs.contains(&"shared@1.0.0".to_string()));
    assert!(conflicts[0].conflicting_specs.contains(&"shared >=2.0.0".to_string()));
    assert_eq!(result.critical_conflicts().len(), 1);
}

#[test]
fn test_unsatisfiable_constraint_is_version_conflict() {
    let resolver = resolver_with(vec![spec("pkg", "1.0.0", &[]), spec("pkg", "1.5.0", &[])]);

    let result = resolve(&resolver, &[("pkg", ">=2.0")]);

    let conflicts = result.conflicts_of(ConflictType::VersionConflict);
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].message.contains("available: 1.0.0, 1.5.0"));
    assert!(result.resolved_packages.is_empty());
}

#[test]
fn test_prefer_installed() {
    let specs: Vec<PackageSpec> = ["1.0.0", "1.1.0", "1.2.0", "2.0.0"]
        .into_iter()
        .map(|v| spec("pkg", v, &[]))
        .collect();

    let mut resolver = with_context(specs.clone(), ResolverContext::new().prefer_installed(true));
    resolver.register_installed(spec("pkg", "1.1.0", &[]));
    let result = resolve(&resolver, &[("pkg", ">=1.0.0")]);
    assert_eq!(version_of(&result, "pkg"), "1.1.0");

    // An installed version outside the range is not kept
    let result = resolve(&resolver, &[("pkg", ">=1.2.0")]);
    assert_eq!(version_of(&result, "pkg"), "2.0.0");

    let mut resolver = resolver_with(specs);
    resolver.register_installed(spec("pkg", "1.1.0", &[]));
    let result = resolve(&resolver, &[("pkg", ">=1.0.0")]);
    assert_eq!(version_of(&result, "pkg"), "2.0.0");
}

fn charts_registry() -> Resolver {
    let charts = PackageSpec::parse("charts", "2.1.0")
        .unwrap()
        .with_dependency("core-draw", "^1.0".parse().unwrap())
        .with_optional_dependency("excel", "xlsx-writer", req(">=0.5"))
        .with_optional_dependency("pdf", "pdf-kit", req("*"));

    resolver_with(vec![
        charts,
        spec("core-draw", "1.3.0", &[]),
        spec("xlsx-writer", "0.6.0", &[]),
        spec("pdf-kit", "3.0.0", &[]),
        spec("report", "1.0.0", &[("charts", "^2.0")]),
    ])
}

#[test]
fn test_extras_only_when_requested() {
    let resolver = charts_registry();

    let result = resolve(&resolver, &[("charts", "^2.1")]);
    assert!(result.is_successful());
    assert!(result.get("xlsx-writer").is_none());
    assert!(result.get("pdf-kit").is_none());

    let mut extras = ExtrasMap::new();
    extras.insert("Charts".to_string(), BTreeSet::from(["Excel".to_string()]));
    let result = resolver.resolve_dependencies([("charts", "^2.1")], &extras).unwrap();

    assert!(result.is_successful());
    assert_eq!(version_of(&result, "xlsx-writer"), "0.6.0");
    assert!(result.get("pdf-kit").is_none());
    assert!(position(&result, "xlsx-writer") < position(&result, "charts"));
}

#[test]
fn test_extras_are_not_propagated_to_dependencies() {
    let resolver = charts_registry();

    let mut extras = ExtrasMap::new();
    extras.insert("report".to_string(), BTreeSet::from(["excel".to_string()]));
    let result = resolver.resolve_dependencies([("report", "*")], &extras).unwrap();

    assert!(result.is_successful());
    assert!(result.get("charts").is_some());
    assert!(result.get("xlsx-writer").is_none());
}

#[test]
fn test_extras_activate_on_already_resolved_root() {
    let resolver = charts_registry();

    let mut extras = ExtrasMap::new();
    extras.insert("charts".to_string(), BTreeSet::from(["pdf".to_string()]));
    let result = resolver
        .resolve_dependencies([("report", "*"), ("charts", ">=2.0")], &extras)
        .unwrap();

    assert!(result.is_successful());
    assert_eq!(version_of(&result, "pdf-kit"), "3.0.0");
    assert!(position(&result, "pdf-kit") < position(&result, "charts"));
}

#[test]
fn test_unknown_extra_is_ignored() {
    let resolver = charts_registry();

    let requirement = Requirement::parse("charts", "*").unwrap().with_extra("svg");
    let result = resolver.resolve_requirements(&[requirement]);

    assert!(result.is_successful());
    assert_eq!(result.resolved_packages.len(), 2);
}

#[test]
fn test_lock_file_round_trip() {
    let resolver = charts_registry();
    let mut extras = ExtrasMap::new();
    extras.insert("charts".to_string(), BTreeSet::from(["excel".to_string(), "pdf".to_string()]));
    let result = resolver.resolve_dependencies([("report", "^1")], &extras).unwrap();
    assert!(result.is_successful());

    let lock = resolver.create_lock_file(&result).unwrap();
    let json = lock.to_json_string().unwrap();
    let restored = resolver
        .resolve_from_lock_file(&LockFile::from_json_str(&json).unwrap())
        .unwrap();

    assert_eq!(restored.resolved_packages, result.resolved_packages);
    assert_eq!(restored.installation_order, result.installation_order);
    assert!(restored.is_successful());
}

#[test]
fn test_lock_file_requires_success() {
    let resolver = resolver_with(vec![spec("app", "1.0.0", &[("ghost", "*")])]);
    let result = resolve(&resolver, &[("app", "*")]);

    let err = resolver.create_lock_file(&result).unwrap_err();
    assert!(matches!(err, SprigError::UnsuccessfulResolution { conflicts: 1 }));
}

#[test]
fn test_wildcard_matches_any_compatible_version() {
    let resolver = with_context(
        vec![
            spec("pkg", "0.1.0", &[]),
            spec("pkg", "3.4.5", &[]),
            spec("pkg", "4.0.0-beta.2", &[]),
        ],
        ResolverContext::new(),
    );

    let result = resolve(&resolver, &[("pkg", "*")]);
    assert_eq!(version_of(&result, "pkg"), "3.4.5");

    assert_eq!(resolver.get_compatible_versions("pkg", &req("*")).len(), 2);
}

#[test]
fn test_circular_dependency_reports_path() {
    let resolver = resolver_with(vec![
        spec("a", "1.0.0", &[("b", "*")]),
        spec("b", "1.0.0", &[("c", "*")]),
        spec("c", "1.0.0", &[("a", "*")]),
    ]);

    let result = resolve(&resolver, &[("a", "*")]);

    assert!(!result.is_successful());
    let cycles = result.conflicts_of(ConflictType::CircularDependency);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].conflicting_specs, ["a", "b", "c", "a"]);
    assert!(cycles[0].message.contains("a -> b -> c -> a"));
    assert_eq!(result.critical_conflicts().len(), 1);

    // Every package still gets an installation slot
    assert_eq!(result.installation_order, ["c", "b", "a"]);
}

#[test]
fn test_extras_on_resolved_root_can_close_a_cycle() {
    let a = PackageSpec::parse("a", "1.0.0")
        .unwrap()
        .with_optional_dependency("x", "b", VersionReq::any());
    let resolver = resolver_with(vec![a, spec("b", "1.0.0", &[("a", "*")])]);

    let mut extras = ExtrasMap::new();
    extras.insert("a".to_string(), BTreeSet::from(["x".to_string()]));
    let result = resolver
        .resolve_dependencies([("b", "*"), ("a", "*")], &extras)
        .unwrap();

    assert!(!result.is_successful());
    let cycles = result.conflicts_of(ConflictType::CircularDependency);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].conflicting_specs, ["b", "a", "b"]);
    assert!(cycles[0].message.contains("b -> a -> b"));

    // b still installs after the dependency it declares
    assert_eq!(result.installation_order, ["a", "b"]);
}

#[test]
fn test_runtime_incompatibility_is_not_critical() {
    let pkg = PackageSpec::parse("pkg", "1.0.0")
        .unwrap()
        .with_runtime_constraint(req(">=3.11"));
    let context = ResolverContext::new().with_runtime_version(Version::parse("3.9").unwrap());
    let resolver = with_context(vec![pkg], context);

    let result = resolve(&resolver, &[("pkg", "*")]);

    assert!(!result.is_successful());
    assert_eq!(result.conflicts_of(ConflictType::RuntimeIncompatible).len(), 1);
    assert!(result.critical_conflicts().is_empty());
}

#[test]
fn test_platform_incompatibility_is_not_critical() {
    let pkg = PackageSpec::parse("pkg", "1.0.0")
        .unwrap()
        .with_platforms(["2023", "2024"]);
    let context = ResolverContext::new().with_platform_version("2022");
    let resolver = with_context(vec![pkg], context);

    let result = resolve(&resolver, &[("pkg", "*")]);

    assert!(!result.is_successful());
    let conflicts = result.conflicts_of(ConflictType::PlatformIncompatible);
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].message.contains("2022"));
    assert!(result.critical_conflicts().is_empty());
}

#[test]
fn test_compatibility_filters_fall_back_to_older_version() {
    let old = PackageSpec::parse("pkg", "1.0.0").unwrap();
    let new = PackageSpec::parse("pkg", "2.0.0")
        .unwrap()
        .with_runtime_constraint(req(">=3.12"));
    let context = ResolverContext::new().with_runtime_version(Version::parse("3.10").unwrap());
    let resolver = with_context(vec![old, new], context);

    let result = resolve(&resolver, &[("pkg", "*")]);

    assert!(result.is_successful());
    assert_eq!(version_of(&result, "pkg"), "1.0.0");
}

#[test]
fn test_prerelease_policy() {
    let specs = vec![spec("pkg", "2.0.0-rc.1", &[])];

    let result = resolve(&resolver_with(specs.clone()), &[("pkg", "*")]);
    assert_eq!(result.conflicts_of(ConflictType::VersionConflict).len(), 1);

    let resolver = with_context(specs, ResolverContext::new().allow_prerelease(true));
    let result = resolve(&resolver, &[("pkg", "*")]);
    assert!(result.is_successful());
    assert_eq!(version_of(&result, "pkg"), "2.0.0-rc.1");
}

#[test]
fn test_every_conflict_is_reported() {
    let resolver = resolver_with(vec![
        spec("app", "1.0.0", &[("ghost-one", "*"), ("ghost-two", "*"), ("lib", ">=5")]),
        spec("lib", "1.0.0", &[]),
    ]);

    let result = resolve(&resolver, &[("app", "*")]);

    assert_eq!(result.conflicts.len(), 3);
    assert_eq!(result.conflicts_of(ConflictType::MissingDependency).len(), 2);
    assert_eq!(result.conflicts_of(ConflictType::VersionConflict).len(), 1);
    assert_eq!(result.resolved_packages.len(), 1);
}

#[test]
fn test_malformed_constraint_is_fatal() {
    let resolver = resolver_with(vec![spec("pkg", "1.0.0", &[])]);

    let err = resolver
        .resolve_dependencies([("pkg", ">=1.0,<<2")], &ExtrasMap::new())
        .unwrap_err();
    assert!(matches!(err, SprigError::InvalidConstraint { .. }));
}

#[test]
fn test_names_are_normalized() {
    let resolver = resolver_with(vec![
        spec("My_Package", "1.0.0", &[("Other.Lib", "*")]),
        spec("other-lib", "0.2.0", &[]),
    ]);

    let result = resolve(&resolver, &[("MY-PACKAGE", "*")]);

    assert!(result.is_successful());
    assert!(result.resolved_packages.contains_key("my-package"));
    assert_eq!(result.installation_order, ["other-lib", "my-package"]);
}

#[test]
fn test_deep_chain_does_not_recurse() {
    let depth = 5_000;
    let specs = (0..depth)
        .map(|i| {
            let spec = PackageSpec::new(&format!("pkg{}", i), Version::new(1, 0, 0));
            if i + 1 < depth {
                spec.with_dependency(&format!("pkg{}", i + 1), VersionReq::any())
            } else {
                spec
            }
        })
        .collect();
    let resolver = resolver_with(specs);

    let result = resolve(&resolver, &[("pkg0", "*")]);

    assert!(result.is_successful());
    assert_eq!(result.resolved_packages.len(), depth);
    assert_eq!(result.installation_order.first().map(String::as_str), Some("pkg4999"));
    assert_eq!(result.installation_order.last().map(String::as_str), Some("pkg0"));
}

#[test]
fn test_resolution_is_repeatable() {
    let resolver = charts_registry();

    let first = resolve(&resolver, &[("report", "*")]);
    let second = resolve(&resolver, &[("report", "*")]);

    assert_eq!(first, second);
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn installation_order_respects_dependencies(
            num_packages in 2usize..10,
            edges in prop::collection::vec((0usize..9, 0usize..9), 0..20)
        ) {
            // Only forward edges, so the registry describes a DAG
            let specs = (0..num_packages)
                .map(|i| {
                    edges
                        .iter()
                        .filter(|(from, to)| *from == i && from < to && *to < num_packages)
                        .fold(PackageSpec::new(&format!("p{}", i), Version::new(1, 0, 0)), |spec, (_, to)| {
                            spec.with_dependency(&format!("p{}", to), VersionReq::any())
                        })
                })
                .collect();
            let resolver = resolver_with(specs);
            let roots: Vec<(String, String)> = (0..num_packages)
                .map(|i| (format!("p{}", i), "*".to_string()))
                .collect();

            let result = resolver.resolve_dependencies(roots, &ExtrasMap::new()).unwrap();

            prop_assert!(result.is_successful());
            prop_assert_eq!(result.installation_order.len(), num_packages);
            for (name, spec) in &result.resolved_packages {
                for dependency in spec.dependencies().keys() {
                    prop_assert!(position(&result, dependency) < position(&result, name));
                }
            }
        }

        #[test]
        fn installation_order_respects_activated_extras(
            num_packages in 2usize..8,
            edges in prop::collection::vec((0usize..7, 0usize..7), 0..12),
            extra_edges in prop::collection::vec((0usize..7, 0usize..7), 0..6),
            with_extras in prop::collection::vec(any::<bool>(), 8),
            reverse_roots in any::<bool>()
        ) {
            let extra_edges: Vec<(usize, usize)> = extra_edges
                .into_iter()
                .filter(|(from, to)| *from < num_packages && *to < num_packages)
                .collect();

            // Required edges stay forward; extras may point anywhere
            let specs = (0..num_packages)
                .map(|i| {
                    let spec = edges
                        .iter()
                        .filter(|(from, to)| *from == i && from < to && *to < num_packages)
                        .fold(PackageSpec::new(&format!("p{}", i), Version::new(1, 0, 0)), |spec, (_, to)| {
                            spec.with_dependency(&format!("p{}", to), VersionReq::any())
                        });
                    extra_edges
                        .iter()
                        .filter(|(from, _)| *from == i)
                        .fold(spec, |spec, (_, to)| {
                            spec.with_optional_dependency("x", &format!("p{}", to), VersionReq::any())
                        })
                })
                .collect();
            let resolver = resolver_with(specs);

            let mut roots: Vec<(String, String)> = (0..num_packages)
                .map(|i| (format!("p{}", i), "*".to_string()))
                .collect();
            if reverse_roots {
                roots.reverse();
            }
            let mut extras = ExtrasMap::new();
            for i in (0..num_packages).filter(|i| with_extras[*i]) {
                extras.insert(format!("p{}", i), BTreeSet::from(["x".to_string()]));
            }

            let result = resolver.resolve_dependencies(roots, &extras).unwrap();

            prop_assert_eq!(result.resolved_packages.len(), num_packages);
            prop_assert_eq!(result.installation_order.len(), num_packages);
            for name in result.resolved_packages.keys() {
                prop_assert!(result.installation_order.contains(name));
            }

            let activated_forward_only = extra_edges
                .iter()
                .filter(|(from, _)| with_extras[*from])
                .all(|(from, to)| from < to);
            if activated_forward_only {
                prop_assert!(result.is_successful());
            }

            if result.conflicts_of(ConflictType::CircularDependency).is_empty() {
                prop_assert!(result.is_successful());
                for (name, spec) in &result.resolved_packages {
                    let activated = extras
                        .get(name)
                        .and_then(|_| spec.extra("x"))
                        .into_iter()
                        .flat_map(|deps| deps.keys());
                    for dependency in spec.dependencies().keys().chain(activated) {
                        prop_assert!(position(&result, dependency) < position(&result, name));
                    }
                }
            }
        }
    }
}
