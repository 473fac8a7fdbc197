//! Worklist-driven dependency resolution
//!
//! Walks the dependency graph from the root requirements with an explicit
//! stack of enter/exit frames. The ordered in-progress set is the current path
//! from a root to the package being resolved, so cycle detection is a set
//! lookup and deep graphs never touch the call stack.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use sprig_core::types::{DependencyKind, PackageSpec, Requirement, ResolverContext, Version, VersionReq};
use sprig_core::utils::normalize_name;

use crate::conflict::{ConflictType, DependencyConflict};
use crate::graph::{DependencyEdge, DependencyGraph, PackageId};
use crate::lockfile::LockFile;
use crate::registry::PackageRegistry;
use crate::semver::{SelectionFailure, VersionSelector};
use crate::ResolverResult;

#[cfg(test)]
mod tests;

/// Extras requested per root package: name -> extra group names
pub type ExtrasMap = BTreeMap<String, BTreeSet<String>>;

/// Dependency resolver owning the registry for one resolution session
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    /// Known and installed packages
    registry: PackageRegistry,
    /// Target runtime/platform and policies
    context: ResolverContext,
}

/// Result of dependency resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionResult {
    /// Selected spec per package name, in resolution order
    pub resolved_packages: IndexMap<String, PackageSpec>,
    /// Every conflict found, in discovery order
    pub conflicts: Vec<DependencyConflict>,
    /// Package names, dependencies before dependents
    pub installation_order: Vec<String>,
}

/// One pending unit of work
#[derive(Debug)]
struct Task {
    name: String,
    constraint: VersionReq,
    /// Dependent that asked for this package, `None` for roots
    parent: Option<String>,
    kind: DependencyKind,
    /// Extra groups to activate; only ever non-empty for roots
    extras: BTreeSet<String>,
}

#[derive(Debug)]
enum Frame {
    /// Resolve a package
    Enter(Task),
    /// All dependencies of a package have been processed
    Exit(String),
}

/// Mutable state of a single `resolve_requirements` call
struct Session<'a> {
    registry: &'a PackageRegistry,
    context: &'a ResolverContext,
    stack: Vec<Frame>,
    resolved: IndexMap<String, &'a PackageSpec>,
    /// Who caused each package to be selected, for conflict messages
    selected_by: HashMap<String, String>,
    in_progress: IndexSet<String>,
    conflicts: Vec<DependencyConflict>,
    graph: DependencyGraph,
}

impl Resolver {
    /// Create a resolver with an empty registry
    pub fn new(context: ResolverContext) -> Self {
        Self {
            registry: PackageRegistry::new(),
            context,
        }
    }

    /// Create a resolver over an already populated registry
    pub fn with_registry(registry: PackageRegistry, context: ResolverContext) -> Self {
        Self { registry, context }
    }

    /// Register an available package version
    pub fn register_package(&mut self, spec: PackageSpec) {
        self.registry.add_package(spec);
    }

    /// Record the installed version of a package
    pub fn register_installed(&mut self, spec: PackageSpec) {
        self.registry.add_installed_package(spec);
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ResolverContext {
        &self.context
    }

    /// Versions of `name` usable in this context, newest first
    pub fn get_compatible_versions(&self, name: &str, constraint: &VersionReq) -> Vec<&PackageSpec> {
        self.selector(name).compatible(constraint)
    }

    fn selector(&self, name: &str) -> VersionSelector<'_> {
        VersionSelector::new(self.registry.versions(name), &self.context)
    }

    /// Resolve `name -> constraint` requirements, activating `extras` for the
    /// root packages that name them.
    ///
    /// Blank names or malformed constraints fail immediately; everything else is
    /// reported as a conflict on the returned result.
    pub fn resolve_dependencies<I, N, C>(&self, requirements: I, extras: &ExtrasMap) -> ResolverResult<ResolutionResult>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let mut requested_extras: ExtrasMap = BTreeMap::new();
        for (name, groups) in extras {
            requested_extras
                .entry(normalize_name(name))
                .or_default()
                .extend(groups.iter().map(|group| normalize_name(group)));
        }

        let mut roots = Vec::new();
        for (name, constraint) in requirements {
            let mut requirement = Requirement::parse(name.as_ref(), constraint.as_ref())?;
            if let Some(groups) = requested_extras.remove(&requirement.name) {
                requirement.extras.extend(groups);
            }
            roots.push(requirement);
        }

        for name in requested_extras.keys() {
            debug!(package = %name, "Extras requested for a package that is not a root requirement");
        }

        Ok(self.resolve_requirements(&roots))
    }

    /// Resolve already-parsed root requirements. Never fails: problems are
    /// collected as conflicts.
    pub fn resolve_requirements(&self, requirements: &[Requirement]) -> ResolutionResult {
        let start_time = Instant::now();
        info!(roots = requirements.len(), "Resolving dependencies");

        let mut session = Session::new(&self.registry, &self.context);
        for requirement in requirements {
            session.stack.push(Frame::Enter(Task {
                name: normalize_name(&requirement.name),
                constraint: requirement.constraint.clone(),
                parent: None,
                kind: DependencyKind::Required,
                extras: requirement.extras.clone(),
            }));
            session.run();
        }

        let result = session.finish();
        info!(
            packages = result.resolved_packages.len(),
            conflicts = result.conflicts.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Resolution finished"
        );
        result
    }

    /// Freeze a successful resolution into a lock file
    pub fn create_lock_file(&self, result: &ResolutionResult) -> ResolverResult<LockFile> {
        LockFile::from_resolution(result, &self.context)
    }

    /// Rebuild a resolution from a lock file without re-resolving
    pub fn resolve_from_lock_file(&self, lock: &LockFile) -> ResolverResult<ResolutionResult> {
        lock.verify()?;

        let runtime = self.context.runtime_version.as_ref().map(Version::to_string);
        if lock.runtime_version.is_some() && runtime.is_some() && lock.runtime_version != runtime {
            warn!(
                locked = ?lock.runtime_version,
                current = ?runtime,
                "Lock file was created for a different runtime version"
            );
        }
        if lock.platform_version.is_some()
            && self.context.platform_version.is_some()
            && lock.platform_version != self.context.platform_version
        {
            warn!(
                locked = ?lock.platform_version,
                current = ?self.context.platform_version,
                "Lock file was created for a different platform version"
            );
        }

        Ok(lock.clone().into_resolution())
    }
}

impl ResolutionResult {
    /// True iff no conflict of any kind was found
    pub fn is_successful(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Version and circular conflicts only; compatibility conflicts are
    /// excluded even though they also make the result unsuccessful.
    pub fn critical_conflicts(&self) -> Vec<&DependencyConflict> {
        self.conflicts.iter().filter(|conflict| conflict.is_critical()).collect()
    }

    /// Conflicts of one type
    pub fn conflicts_of(&self, conflict_type: ConflictType) -> Vec<&DependencyConflict> {
        self.conflicts
            .iter()
            .filter(|conflict| conflict.conflict_type == conflict_type)
            .collect()
    }

    /// Selected spec for a package
    pub fn get(&self, name: &str) -> Option<&PackageSpec> {
        self.resolved_packages.get(&normalize_name(name))
    }
}

impl<'a> Session<'a> {
    fn new(registry: &'a PackageRegistry, context: &'a ResolverContext) -> Self {
        Self {
            registry,
            context,
            stack: Vec::new(),
            resolved: IndexMap::new(),
            selected_by: HashMap::new(),
            in_progress: IndexSet::new(),
            conflicts: Vec::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// Drain the worklist
    fn run(&mut self) {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Enter(task) => self.enter(task),
                Frame::Exit(name) => {
                    self.in_progress.shift_remove(&name);
                }
            }
        }
    }

    fn enter(&mut self, task: Task) {
        if let Some(start) = self.in_progress.get_index_of(&task.name) {
            let mut path: Vec<String> = self.in_progress.iter().skip(start).cloned().collect();
            path.push(task.name.clone());
            self.report(DependencyConflict::circular(path));
            return;
        }

        if let Some(&existing) = self.resolved.get(&task.name) {
            self.revisit(task, existing);
            return;
        }

        let installed = self.registry.installed(&task.name).map(PackageSpec::version);
        let selector = VersionSelector::new(self.registry.versions(&task.name), self.context);

        match selector.select(&task.constraint, installed) {
            Ok(spec) => self.accept(task, spec),
            Err(failure) => {
                let conflict = self.selection_conflict(&task, failure);
                self.report(conflict);
            }
        }
    }

    /// A package that is already resolved is requested again
    fn revisit(&mut self, task: Task, existing: &'a PackageSpec) {
        if !task.constraint.matches(existing.version()) {
            let selected_by = self
                .selected_by
                .get(&task.name)
                .cloned()
                .unwrap_or_else(|| "a root requirement".to_string());
            let conflict = DependencyConflict::new(
                ConflictType::VersionConflict,
                task.name.clone(),
                vec![existing.id(), format!("{} {}", task.name, task.constraint)],
                format!(
                    "Package '{}' is already resolved to {} (required by {}), which does not satisfy '{}' required by {}",
                    task.name,
                    existing.version(),
                    selected_by,
                    task.constraint,
                    self.requester(&task)
                ),
            );
            self.report(conflict);
            return;
        }

        debug!(package = %existing.id(), constraint = %task.constraint, "Reusing resolved package");
        self.record_edge(&task);

        if !task.extras.is_empty() {
            // A root requirement can still activate extras on a package that
            // an earlier root pulled in.
            self.in_progress.insert(task.name.clone());
            self.stack.push(Frame::Exit(task.name.clone()));
            let children = self.extra_tasks(&task, existing);
            self.push_children(children);
        }
    }

    fn accept(&mut self, task: Task, spec: &'a PackageSpec) {
        debug!(package = %spec.id(), constraint = %task.constraint, kind = %task.kind, "Selected package");

        let requester = self.requester(&task);
        self.resolved.insert(task.name.clone(), spec);
        self.selected_by.insert(task.name.clone(), requester);
        self.graph.add_package(PackageId::new(task.name.clone(), spec.version().clone()));
        self.record_edge(&task);

        self.in_progress.insert(task.name.clone());
        self.stack.push(Frame::Exit(task.name.clone()));

        let mut children: Vec<Task> = spec
            .dependencies()
            .iter()
            .map(|(name, constraint)| Task {
                name: name.clone(),
                constraint: constraint.clone(),
                parent: Some(task.name.clone()),
                kind: DependencyKind::Required,
                extras: BTreeSet::new(),
            })
            .collect();
        children.extend(self.extra_tasks(&task, spec));
        self.push_children(children);
    }

    /// Dependencies activated by the extras requested on a root package
    fn extra_tasks(&self, task: &Task, spec: &PackageSpec) -> Vec<Task> {
        let mut tasks = Vec::new();
        for extra in &task.extras {
            let Some(dependencies) = spec.extra(extra) else {
                warn!(package = %spec.id(), extra = %extra, "Ignoring unknown extra");
                continue;
            };
            tasks.extend(dependencies.iter().map(|(name, constraint)| Task {
                name: name.clone(),
                constraint: constraint.clone(),
                parent: Some(task.name.clone()),
                kind: DependencyKind::Extra(extra.clone()),
                extras: BTreeSet::new(),
            }));
        }
        tasks
    }

    /// Push so that children are processed in declaration order
    fn push_children(&mut self, children: Vec<Task>) {
        self.stack.extend(children.into_iter().rev().map(Frame::Enter));
    }

    fn record_edge(&mut self, task: &Task) {
        let Some(parent) = &task.parent else {
            return;
        };

        // Extras activated on an already finished package can point back at
        // one of its dependents; that edge would close a cycle.
        if let Some(mut path) = self.graph.path_between(&task.name, parent) {
            path.push(task.name.clone());
            self.report(DependencyConflict::circular(path));
            return;
        }

        let edge = DependencyEdge::new(task.constraint.clone(), task.kind.clone());
        if let Err(err) = self.graph.add_dependency(parent, &task.name, edge) {
            warn!(%err, "Failed to record dependency edge");
        }
    }

    fn requester(&self, task: &Task) -> String {
        match &task.parent {
            Some(parent) => match self.resolved.get(parent) {
                Some(spec) => spec.id(),
                None => parent.clone(),
            },
            None => "a root requirement".to_string(),
        }
    }

    fn selection_conflict(&self, task: &Task, failure: SelectionFailure) -> DependencyConflict {
        let requirement = format!("{} {}", task.name, task.constraint);
        let requester = self.requester(task);
        let ids = |versions: &[Version]| -> Vec<String> {
            std::iter::once(requirement.clone())
                .chain(versions.iter().map(|v| format!("{}@{}", task.name, v)))
                .collect()
        };

        match failure {
            SelectionFailure::NotFound => DependencyConflict::new(
                ConflictType::MissingDependency,
                task.name.clone(),
                vec![requirement.clone()],
                format!("Package '{}' required by {} was not found", task.name, requester),
            ),
            SelectionFailure::Unsatisfiable { available } => DependencyConflict::new(
                ConflictType::VersionConflict,
                task.name.clone(),
                ids(&available),
                format!(
                    "No version of '{}' satisfies '{}' required by {} (available: {})",
                    task.name,
                    task.constraint,
                    requester,
                    join_versions(&available)
                ),
            ),
            SelectionFailure::PrereleaseOnly { prereleases } => DependencyConflict::new(
                ConflictType::VersionConflict,
                task.name.clone(),
                ids(&prereleases),
                format!(
                    "Only prerelease versions of '{}' satisfy '{}' required by {} and prereleases are not allowed ({})",
                    task.name,
                    task.constraint,
                    requester,
                    join_versions(&prereleases)
                ),
            ),
            SelectionFailure::RuntimeIncompatible { rejected } => DependencyConflict::new(
                ConflictType::RuntimeIncompatible,
                task.name.clone(),
                ids(&rejected),
                format!(
                    "No version of '{}' matching '{}' supports runtime {} (rejected: {})",
                    task.name,
                    task.constraint,
                    self.context
                        .runtime_version
                        .as_ref()
                        .map_or_else(|| "unknown".to_string(), Version::to_string),
                    join_versions(&rejected)
                ),
            ),
            SelectionFailure::PlatformIncompatible { rejected } => DependencyConflict::new(
                ConflictType::PlatformIncompatible,
                task.name.clone(),
                ids(&rejected),
                format!(
                    "No version of '{}' matching '{}' supports platform {} (rejected: {})",
                    task.name,
                    task.constraint,
                    self.context.platform_version.as_deref().unwrap_or("unknown"),
                    join_versions(&rejected)
                ),
            ),
        }
    }

    fn report(&mut self, conflict: DependencyConflict) {
        warn!(
            conflict_type = %conflict.conflict_type,
            package = %conflict.package_name,
            "{}",
            conflict.message
        );
        self.conflicts.push(conflict);
    }

    fn finish(mut self) -> ResolutionResult {
        let installation_order = match self.graph.installation_order() {
            Ok(order) => order.into_iter().map(|id| id.name).collect(),
            Err(err) => {
                warn!(%err, "Falling back to resolution order");
                if let Err(cycle) = self.graph.detect_cycles() {
                    let path = cycle.iter().chain(cycle.first()).map(|id| id.name.clone()).collect();
                    self.conflicts.push(DependencyConflict::circular(path));
                }
                self.resolved.keys().cloned().collect()
            }
        };

        ResolutionResult {
            resolved_packages: self
                .resolved
                .into_iter()
                .map(|(name, spec)| (name, spec.clone()))
                .collect(),
            conflicts: self.conflicts,
            installation_order,
        }
    }
}

fn join_versions(versions: &[Version]) -> String {
    versions
        .iter()
        .map(Version::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
