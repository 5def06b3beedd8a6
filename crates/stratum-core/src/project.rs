//! A loaded project: scope types, compiled scopes, and roots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, trace, warn};

use crate::config::{self, CONFIG_FILE};
use crate::error::StratumError;
use crate::root::Root;
use crate::schedule::{ChainPolicy, DependencyScheduler, Plan, Roots, assert_acyclic};
use crate::scope::types::type_names;
use crate::scope::{CompiledScopes, ScopeDataNode, ScopeMatcher, ScopeType, compile_all};

/// Immutable project state, computed once at load and shared by every
/// request made against the project.
#[derive(Debug, Clone)]
pub struct Project {
    id: String,
    project_dir: PathBuf,
    scope_types: Vec<ScopeType>,
    compiled_scopes: CompiledScopes,
    roots: Roots,
}

impl Project {
    /// Assemble a project from already-parsed parts.
    ///
    /// Flattens the scope data, checks every root's scope types against the
    /// project's, and rejects dependency cycles anywhere in the project.
    /// Scope matches must name exactly their root's scope types, and
    /// dependency overrides may only name scope types the dependency uses.
    pub fn new(
        id: impl Into<String>,
        scope_types: Vec<ScopeType>,
        scope_data: &[ScopeDataNode],
        roots: Vec<Root>,
    ) -> Result<Self, StratumError> {
        let compiled_scopes = compile_all(scope_data, &scope_types)?;
        let project_types = type_names(&scope_types);

        let mut by_name = Roots::new();
        for root in roots {
            if !project_types.starts_with(root.scope_types()) {
                return Err(StratumError::InvalidRootScopeTypes {
                    root: root.name().to_string(),
                    root_types: root.scope_types().to_vec(),
                    project_types,
                });
            }
            check_scope_matches(&root)?;
            by_name.insert(root.name().to_string(), Arc::new(root));
        }
        assert_acyclic(&by_name)?;
        check_overrides(&by_name)?;

        let project = Self {
            id: id.into(),
            project_dir: PathBuf::new(),
            scope_types,
            compiled_scopes,
            roots: by_name,
        };
        debug!(
            project = %project.id,
            scopes = project.compiled_scopes.len(),
            roots = project.roots.len(),
            "project assembled"
        );
        for scope in &project.compiled_scopes {
            trace!("{}", scope.address());
        }
        Ok(project)
    }

    /// Load a project from its configuration file, along with its scope data
    /// and every root in its roots directory.
    pub fn load(config_file: &Path) -> anyhow::Result<Self> {
        let config_file = std::fs::canonicalize(config_file).with_context(|| {
            format!("Failed to locate project file: {}", config_file.display())
        })?;
        let project_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let cfg = config::parse_project_toml(&config_file)?;

        let mut scope_data = Vec::new();
        for file in &cfg.project.scope_data {
            let path = project_dir.join(file);
            debug!("Reading scope data file {}", path.display());
            if !path.exists() {
                warn!("Scope data file {} does not exist; skipping", path.display());
                continue;
            }
            let data = config::parse_scope_data_toml(&path)?;
            scope_data.extend(data.scopes);
        }

        let roots_dir = project_dir.join(&cfg.project.roots_dir);
        let roots = load_roots(&roots_dir)?;

        let project = Self::new(cfg.project.id, cfg.scope_types, &scope_data, roots)
            .with_context(|| format!("Invalid project: {}", config_file.display()))?;
        Ok(Self {
            project_dir,
            ..project
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory holding the project file (empty for in-memory projects).
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn scope_types(&self) -> &[ScopeType] {
        &self.scope_types
    }

    pub fn compiled_scopes(&self) -> &CompiledScopes {
        &self.compiled_scopes
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn root(&self, name: &str) -> Result<&Arc<Root>, StratumError> {
        self.roots.get(name).ok_or_else(|| StratumError::UnknownRoot {
            name: name.to_string(),
        })
    }

    pub fn matcher(&self) -> ScopeMatcher<'_> {
        ScopeMatcher::new(&self.compiled_scopes, &self.scope_types)
    }

    pub fn scheduler(&self) -> DependencyScheduler<'_> {
        DependencyScheduler::new(&self.roots, self.matcher())
    }

    /// Plan a request: the named root at the given scope addresses (all of
    /// its scopes if none are given), chained per `policy`.
    pub fn plan<S: AsRef<str>>(
        &self,
        root_name: &str,
        addresses: &[S],
        policy: ChainPolicy,
    ) -> Result<Plan, StratumError> {
        let root = self.root(root_name)?;
        self.scheduler().prepare_batches(root, addresses, policy)
    }

    /// Every compiled scope matching a user-supplied address.
    pub fn scopes_matching(&self, address: &str) -> Result<CompiledScopes, StratumError> {
        let filter = self.matcher().make_filter(address)?;
        Ok(self.compiled_scopes.matching(&filter))
    }

    /// The roots and their dependencies as a DOT digraph, one edge from each
    /// root to each root it depends on. Roots and edges are sorted by name.
    pub fn root_dependency_graph(&self) -> String {
        let mut dot = format!("digraph {} {{\n", quote_dot(&self.id));
        for root in self.roots.values() {
            dot.push_str(&format!("  {};\n", quote_dot(root.name())));
        }
        for root in self.roots.values() {
            let mut dependencies: Vec<&str> = root
                .dependencies()
                .iter()
                .map(|d| d.root.as_str())
                .collect();
            dependencies.sort_unstable();
            dependencies.dedup();
            for dependency in dependencies {
                dot.push_str(&format!(
                    "  {} -> {};\n",
                    quote_dot(root.name()),
                    quote_dot(dependency)
                ));
            }
        }
        dot.push('}');
        dot
    }

    /// Whether any compiled scope matches the address.
    pub fn is_scope_value(&self, address: &str) -> Result<bool, StratumError> {
        let filter = self.matcher().make_filter(address)?;
        Ok(self.compiled_scopes.iter().any(|scope| scope.matches(&filter)))
    }
}

fn quote_dot(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

// A scope match at any other depth would select scopes whose build
// directories nest inside one another.
fn check_scope_matches(root: &Root) -> Result<(), StratumError> {
    let root_types: BTreeSet<&str> = root.scope_types().iter().map(String::as_str).collect();
    for scope_match in root.scope_matches() {
        let match_types: BTreeSet<&str> =
            scope_match.scope_types.keys().map(String::as_str).collect();
        if match_types != root_types {
            return Err(StratumError::InvalidScopeMatch {
                root: root.name().to_string(),
                match_types: scope_match.scope_types.keys().cloned().collect(),
                root_types: root.scope_types().to_vec(),
            });
        }
    }
    Ok(())
}

fn check_overrides(roots: &Roots) -> Result<(), StratumError> {
    for root in roots.values() {
        for dependency in root.dependencies() {
            let Some(ancestor) = roots.get(&dependency.root) else {
                continue;
            };
            if let Some(unknown) = dependency
                .scopes
                .keys()
                .find(|scope_type| !ancestor.scope_types().contains(*scope_type))
            {
                return Err(StratumError::UnknownOverrideScopeType {
                    root: root.name().to_string(),
                    dependency: dependency.root.clone(),
                    scope_type: unknown.clone(),
                    dependency_types: ancestor.scope_types().to_vec(),
                });
            }
        }
    }
    Ok(())
}

/// Every root under `roots_dir`: one per subdirectory holding a root file.
fn load_roots(roots_dir: &Path) -> anyhow::Result<Vec<Root>> {
    if !roots_dir.exists() {
        debug!("Roots directory {} does not exist", roots_dir.display());
        return Ok(Vec::new());
    }

    let mut dirs = std::fs::read_dir(roots_dir)
        .with_context(|| format!("Failed to read roots directory: {}", roots_dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read roots directory: {}", roots_dir.display()))?;
    dirs.retain(|p| p.is_dir());
    dirs.sort();

    let mut roots = Vec::new();
    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let cfg_file = dir.join(CONFIG_FILE);
        if !cfg_file.exists() {
            warn!(
                "Found a root named '{}' in {}, but it does not contain a {} configuration",
                name,
                roots_dir.display(),
                CONFIG_FILE
            );
            continue;
        }
        debug!("Adding root {}", dir.display());
        let cfg = config::parse_root_toml(&cfg_file)?;
        roots.push(cfg.into_root(name, dir));
    }
    Ok(roots)
}
