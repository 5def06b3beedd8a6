//! Nested scope data, as authored in scope-data files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::compiled::{CompiledScope, CompiledScopes};
use super::types::ScopeType;
use crate::error::StratumError;

/// One value for a single scope type, with children of the next scope type
/// in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDataNode {
    #[serde(rename = "type")]
    pub scope_type: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    #[serde(rename = "scope", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScopeDataNode>,
}

impl ScopeDataNode {
    pub fn new(scope_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope_type: scope_type.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ScopeDataNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ScopeDataNode::count).sum::<usize>()
    }

    /// Flatten this subtree (rooted at the top of the hierarchy) into one
    /// compiled scope per node.
    pub fn compile(&self, scope_types: &[ScopeType]) -> Result<CompiledScopes, StratumError> {
        let mut out = Vec::with_capacity(self.count());
        self.compile_into(None, 0, scope_types, &mut out)?;
        Ok(out.into_iter().collect())
    }

    fn compile_into(
        &self,
        parent: Option<&CompiledScope>,
        depth: usize,
        scope_types: &[ScopeType],
        out: &mut Vec<CompiledScope>,
    ) -> Result<(), StratumError> {
        let expected = scope_types.get(depth).map(|t| t.name.as_str());
        if expected != Some(self.scope_type.as_str()) {
            return Err(StratumError::ScopeTypeOutOfOrder {
                value: self.name.clone(),
                found: self.scope_type.clone(),
                expected: expected.unwrap_or("<nothing, the hierarchy ends>").to_string(),
                depth,
            });
        }
        validate_value(&self.scope_type, &self.name)?;

        let this = CompiledScope::child_of(parent, &self.scope_type, &self.name, &self.attributes);
        for child in &self.children {
            child.compile_into(Some(&this), depth + 1, scope_types, out)?;
        }
        out.push(this);
        Ok(())
    }
}

/// Compile every tree into one deduplicated, address-sorted collection.
pub fn compile_all(
    roots: &[ScopeDataNode],
    scope_types: &[ScopeType],
) -> Result<CompiledScopes, StratumError> {
    let mut all = CompiledScopes::new();
    for node in roots {
        all.extend(node.compile(scope_types)?);
    }
    Ok(all.deduplicate().sorted())
}

fn validate_value(scope_type: &str, value: &str) -> Result<(), StratumError> {
    let reason = if value.is_empty() {
        Some("it is empty")
    } else if value == ".." {
        Some("'..' is reserved")
    } else if value.contains('.') {
        Some("it contains '.', the address separator")
    } else if value.contains(['/', '\\']) {
        Some("it contains a path separator")
    } else if value.chars().any(char::is_whitespace) {
        Some("it contains whitespace")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StratumError::InvalidScopeValue {
            scope_type: scope_type.to_string(),
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
