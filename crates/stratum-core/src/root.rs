//! Root definitions: independently buildable configuration units.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A root's declaration that it depends on another root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDependency {
    /// Name of the root this one depends on.
    pub root: String,

    /// Scope values (or patterns) to use for the dependency instead of
    /// inheriting them from the dependent's scope.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scopes: BTreeMap<String, String>,
}

impl RootDependency {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            scopes: BTreeMap::new(),
        }
    }

    pub fn with_scope(mut self, scope_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.scopes.insert(scope_type.into(), value.into());
        self
    }
}

/// A set of scope-type patterns a root applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMatch {
    pub scope_types: BTreeMap<String, String>,
}

impl ScopeMatch {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            scope_types: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One buildable unit, applied once per matching compiled scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    name: String,
    dir: PathBuf,
    scope_types: Vec<String>,
    scope_matches: Vec<ScopeMatch>,
    dependencies: Vec<RootDependency>,
    inputs: BTreeMap<String, Value>,
}

impl Root {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, scope_types: &[S]) -> Self {
        Self {
            name: name.into(),
            dir: PathBuf::new(),
            scope_types: scope_types.iter().map(|s| s.as_ref().to_string()).collect(),
            scope_matches: Vec::new(),
            dependencies: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_scope_match(mut self, scope_match: ScopeMatch) -> Self {
        self.scope_matches.push(scope_match);
        self
    }

    pub fn with_dependency(mut self, dependency: RootDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_inputs(mut self, inputs: BTreeMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the root's source files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The prefix of project scope types this root operates at.
    pub fn scope_types(&self) -> &[String] {
        &self.scope_types
    }

    pub fn scope_matches(&self) -> &[ScopeMatch] {
        &self.scope_matches
    }

    pub fn dependencies(&self) -> &[RootDependency] {
        &self.dependencies
    }

    pub fn inputs(&self) -> &BTreeMap<String, Value> {
        &self.inputs
    }
}
