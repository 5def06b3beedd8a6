use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::CONFIG_FILE;
use crate::exec::UnitAction;
use crate::fs::{copy_tree, remove_path_if_exists};
use crate::schedule::{BUILD_DIR, ExecutionUnit};

/// Variables file written into every built unit, from the root's inputs.
pub const INPUTS_FILE: &str = "stratum.auto.tfvars.json";

/// Debug context written into every built unit.
pub const CONTEXT_FILE: &str = ".stratum.context.json";

/// What a built unit knows about where it came from.
#[derive(Debug, Serialize)]
pub struct UnitContext<'a> {
    pub root: &'a str,
    pub address: String,
    pub scopes: BTreeMap<String, String>,
    pub attributes: &'a BTreeMap<String, Value>,
    pub attribute_sources: BTreeMap<&'a str, &'a str>,
}

impl<'a> UnitContext<'a> {
    pub fn for_unit(unit: &'a ExecutionUnit) -> Self {
        let scope = unit.scope();
        let attribute_sources = scope
            .attributes()
            .keys()
            .filter_map(|key| {
                scope
                    .attribute_source(key)
                    .map(|source| (key.as_str(), source))
            })
            .collect();
        Self {
            root: unit.root().name(),
            address: scope.address(),
            scopes: scope.to_value_map(),
            attributes: scope.attributes(),
            attribute_sources,
        }
    }
}

/// Materialize each unit into its own directory under the root's build
/// directory. Outputs the destination path.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildAction;

impl UnitAction for BuildAction {
    fn name(&self) -> &str {
        "build"
    }

    fn run(&self, unit: &ExecutionUnit) -> anyhow::Result<String> {
        let dest = unit.destination();
        if remove_path_if_exists(&dest)? {
            debug!("Removed previous build at {}", dest.display());
        }
        fs::create_dir_all(&dest)
            .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

        let src = unit.root().dir();
        let copied = copy_tree(src, &dest, &|path| is_root_metadata(src, path))?;
        debug!("Copied {} files from {} to {}", copied, src.display(), dest.display());

        write_json(&dest.join(INPUTS_FILE), unit.root().inputs())?;
        write_json(&dest.join(CONTEXT_FILE), &UnitContext::for_unit(unit))?;

        Ok(dest.display().to_string())
    }
}

fn is_root_metadata(root_dir: &Path, path: &Path) -> bool {
    path == root_dir.join(CONFIG_FILE) || path == root_dir.join(BUILD_DIR)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::Root;
    use crate::scope::CompiledScope;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn build_skips_metadata_and_writes_context() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vpc");
        fs::create_dir_all(dir.join(BUILD_DIR).join("stale")).unwrap();
        fs::write(dir.join(CONFIG_FILE), "[root]\nscope_types = [\"account\"]\n").unwrap();
        fs::write(dir.join("main.tf"), "# vpc").unwrap();

        let root = Root::new("vpc", &["account"])
            .with_dir(&dir)
            .with_inputs(BTreeMap::from([("cidr".to_string(), Value::from("10.0.0.0/16"))]));
        let scope = CompiledScope::new(&["account"], &["acme"])
            .with_attribute("owner", Value::from("platform"));
        let unit = ExecutionUnit::new(Arc::new(root), Arc::new(scope));

        let out = BuildAction.run(&unit).unwrap();
        let dest = dir.join(BUILD_DIR).join("acme");
        assert_eq!(out, dest.display().to_string());
        assert!(dest.join("main.tf").exists());
        assert!(!dest.join(CONFIG_FILE).exists());
        assert!(!dest.join(BUILD_DIR).exists());

        let inputs: Value =
            serde_json::from_str(&fs::read_to_string(dest.join(INPUTS_FILE)).unwrap()).unwrap();
        assert_eq!(inputs["cidr"], "10.0.0.0/16");

        let context: Value =
            serde_json::from_str(&fs::read_to_string(dest.join(CONTEXT_FILE)).unwrap()).unwrap();
        assert_eq!(context["root"], "vpc");
        assert_eq!(context["scopes"]["account"], "acme");
        assert_eq!(context["attribute_sources"]["owner"], "account.acme");
    }
}
