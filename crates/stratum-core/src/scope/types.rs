//! Scope types: the ordered levels of a project's hierarchy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single level of the project's scope hierarchy (e.g. `account`).
///
/// The order of a project's scope types is significant: it defines the
/// hierarchy depth and the positional meaning of scope values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeType {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ScopeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Names of the given scope types, in hierarchy order.
pub fn type_names(scope_types: &[ScopeType]) -> Vec<String> {
    scope_types.iter().map(|t| t.name.clone()).collect()
}
