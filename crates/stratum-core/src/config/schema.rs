//! Configuration schema for stratum.toml files
//!
//! Three kinds of file make up a project:
//! - Project: ./stratum.toml (identity, scope types, where data and roots live)
//! - Scope data: files listed in `project.scope_data` (nested `[[scope]]` tables)
//! - Root: <roots_dir>/<name>/stratum.toml (a `[root]` table)

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::root::{Root, RootDependency, ScopeMatch};
use crate::scope::{ScopeDataNode, ScopeType};

/// File name of project and root configuration files.
pub const CONFIG_FILE: &str = "stratum.toml";

/// Top-level project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,

    /// Scope types, in hierarchy order
    #[serde(default, rename = "scope")]
    pub scope_types: Vec<ScopeType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub id: String,

    /// Directory holding one subdirectory per root, relative to the project file
    #[serde(default = "default_roots_dir")]
    pub roots_dir: PathBuf,

    /// Scope data files, relative to the project file
    #[serde(default)]
    pub scope_data: Vec<PathBuf>,
}

fn default_roots_dir() -> PathBuf {
    PathBuf::from("roots")
}

impl ProjectConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.id.trim().is_empty() {
            anyhow::bail!("Project id must not be empty");
        }
        if self.scope_types.is_empty() {
            anyhow::bail!(
                "This project has no scope types! Define them with [[scope]] tables in {}",
                CONFIG_FILE
            );
        }
        let mut seen = HashSet::new();
        for scope_type in &self.scope_types {
            if scope_type.name.is_empty() || scope_type.name.contains('.') {
                anyhow::bail!(
                    "Invalid scope type name '{}': names must be non-empty and contain no '.'",
                    scope_type.name
                );
            }
            if !seen.insert(scope_type.name.as_str()) {
                anyhow::bail!("Scope type '{}' is declared twice", scope_type.name);
            }
        }
        Ok(())
    }
}

/// A scope data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeDataConfig {
    #[serde(default, rename = "scope")]
    pub scopes: Vec<ScopeDataNode>,
}

/// A root's configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    pub root: RootSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootSection {
    /// Prefix of the project's scope types this root operates at
    #[serde(default)]
    pub scope_types: Vec<String>,

    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<RootDependency>,

    #[serde(default, rename = "scope_match")]
    pub scope_matches: Vec<ScopeMatch>,

    /// Values written to the built root's tfvars file
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
}

impl RootConfig {
    /// Turn the parsed file into a root named `name`, living in `dir`.
    pub fn into_root(self, name: impl Into<String>, dir: impl Into<PathBuf>) -> Root {
        let section = self.root;
        let root = section
            .dependencies
            .into_iter()
            .fold(Root::new(name, &section.scope_types), Root::with_dependency);
        section
            .scope_matches
            .into_iter()
            .fold(root, Root::with_scope_match)
            .with_inputs(section.inputs)
            .with_dir(dir)
    }
}
