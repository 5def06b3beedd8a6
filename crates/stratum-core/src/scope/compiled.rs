//! Compiled scopes: flattened, fully-qualified scope permutations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::filter::ScopeFilter;

/// One permutation of several scope types, from the top of the hierarchy
/// down to some depth.
///
/// Attributes are merged along the path, with values from narrower scopes
/// overriding those of broader scopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledScope {
    scope_types: Vec<String>,
    scope_values: Vec<String>,
    attributes: BTreeMap<String, Value>,
    attribute_sources: BTreeMap<String, String>,
}

impl CompiledScope {
    /// Build a scope from parallel type/value sequences, without attributes.
    ///
    /// # Panics
    ///
    /// Panics if the sequences differ in length.
    pub fn new<T, V>(scope_types: &[T], scope_values: &[V]) -> Self
    where
        T: AsRef<str>,
        V: AsRef<str>,
    {
        assert_eq!(
            scope_types.len(),
            scope_values.len(),
            "scope types and values must have equal length"
        );
        Self {
            scope_types: scope_types.iter().map(|t| t.as_ref().to_string()).collect(),
            scope_values: scope_values.iter().map(|v| v.as_ref().to_string()).collect(),
            attributes: BTreeMap::new(),
            attribute_sources: BTreeMap::new(),
        }
    }

    /// Extend `parent` (if any) by one level, layering `attributes` on top of
    /// a copy of the parent's attributes.
    pub(crate) fn child_of(
        parent: Option<&CompiledScope>,
        scope_type: &str,
        value: &str,
        attributes: &BTreeMap<String, Value>,
    ) -> Self {
        let mut scope = match parent {
            Some(parent) => parent.clone(),
            None => CompiledScope::new::<&str, &str>(&[], &[]),
        };
        scope.scope_types.push(scope_type.to_string());
        scope.scope_values.push(value.to_string());

        let address = scope.address();
        for (key, value) in attributes {
            scope.attributes.insert(key.clone(), value.clone());
            scope.attribute_sources.insert(key.clone(), address.clone());
        }
        scope
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        let address = self.address();
        self.attributes.insert(key.clone(), value);
        self.attribute_sources.insert(key, address);
        self
    }

    pub fn scope_types(&self) -> &[String] {
        &self.scope_types
    }

    pub fn scope_values(&self) -> &[String] {
        &self.scope_values
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Address of the scope that supplied the attribute's effective value.
    pub fn attribute_source(&self, key: &str) -> Option<&str> {
        self.attribute_sources.get(key).map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.scope_types.len()
    }

    /// Value at the given scope type, if the scope reaches that deep.
    pub fn value_of(&self, scope_type: &str) -> Option<&str> {
        self.scope_types
            .iter()
            .position(|t| t == scope_type)
            .map(|idx| self.scope_values[idx].as_str())
    }

    /// Fully-qualified address: types and values interleaved, dot-joined.
    pub fn address(&self) -> String {
        self.scope_types
            .iter()
            .zip(&self.scope_values)
            .map(|(t, v)| format!("{t}.{v}"))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Just the values, dot-joined.
    pub fn values_path(&self) -> String {
        self.scope_values.join(".")
    }

    pub fn to_value_map(&self) -> BTreeMap<String, String> {
        self.scope_types
            .iter()
            .cloned()
            .zip(self.scope_values.iter().cloned())
            .collect()
    }

    pub fn matches(&self, filter: &ScopeFilter) -> bool {
        filter.is_match(&self.scope_types, &self.scope_values)
    }
}

impl fmt::Display for CompiledScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// A list of compiled scopes, shared by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledScopes(Vec<Arc<CompiledScope>>);

impl CompiledScopes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<CompiledScope>> {
        self.0.iter()
    }

    pub fn push(&mut self, scope: Arc<CompiledScope>) {
        self.0.push(scope);
    }

    pub fn extend(&mut self, other: CompiledScopes) {
        self.0.extend(other.0);
    }

    /// Keep only the first scope seen for each address.
    pub fn deduplicate(self) -> Self {
        let mut seen = HashSet::new();
        Self(
            self.0
                .into_iter()
                .filter(|scope| seen.insert(scope.address()))
                .collect(),
        )
    }

    /// Sort by address.
    pub fn sorted(mut self) -> Self {
        self.0.sort_by_cached_key(|scope| scope.address());
        self
    }

    /// The scopes that match `filter`.
    pub fn matching(&self, filter: &ScopeFilter) -> Self {
        Self(
            self.0
                .iter()
                .filter(|scope| scope.matches(filter))
                .cloned()
                .collect(),
        )
    }

    pub fn addresses(&self) -> Vec<String> {
        self.0.iter().map(|scope| scope.address()).collect()
    }
}

impl FromIterator<Arc<CompiledScope>> for CompiledScopes {
    fn from_iter<I: IntoIterator<Item = Arc<CompiledScope>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<CompiledScope> for CompiledScopes {
    fn from_iter<I: IntoIterator<Item = CompiledScope>>(iter: I) -> Self {
        Self(iter.into_iter().map(Arc::new).collect())
    }
}

impl IntoIterator for CompiledScopes {
    type Item = Arc<CompiledScope>;
    type IntoIter = std::vec::IntoIter<Arc<CompiledScope>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompiledScopes {
    type Item = &'a Arc<CompiledScope>;
    type IntoIter = std::slice::Iter<'a, Arc<CompiledScope>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(values: &[&str]) -> CompiledScope {
        let types = ["account", "region", "env"];
        CompiledScope::new(&types[..values.len()], values)
    }

    #[test]
    fn address_interleaves_types_and_values() {
        let s = scope(&["acme", "us-west-1"]);
        assert_eq!(s.address(), "account.acme.region.us-west-1");
        assert_eq!(s.values_path(), "acme.us-west-1");
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let scopes: CompiledScopes = vec![
            scope(&["acme"]),
            scope(&["acme", "us-west-1"]),
            scope(&["acme"]),
            scope(&["globex"]),
            scope(&["acme", "us-west-1"]),
        ]
        .into_iter()
        .collect();

        let once = scopes.deduplicate();
        let twice = once.clone().deduplicate();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);

        let addresses: HashSet<String> = once.addresses().into_iter().collect();
        assert_eq!(addresses.len(), once.len());
    }

    #[test]
    fn sorted_orders_by_address() {
        let scopes: CompiledScopes = vec![
            scope(&["globex"]),
            scope(&["acme", "us-west-1"]),
            scope(&["acme"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            scopes.sorted().addresses(),
            vec![
                "account.acme",
                "account.acme.region.us-west-1",
                "account.globex"
            ]
        );
    }

    #[test]
    fn child_attributes_override_parent() {
        let parent = CompiledScope::child_of(
            None,
            "account",
            "acme",
            &BTreeMap::from([
                ("owner".to_string(), Value::from("platform")),
                ("tier".to_string(), Value::from(1)),
            ]),
        );
        let child = CompiledScope::child_of(
            Some(&parent),
            "region",
            "us-west-1",
            &BTreeMap::from([("tier".to_string(), Value::from(2))]),
        );

        assert_eq!(child.attributes()["owner"], Value::from("platform"));
        assert_eq!(child.attributes()["tier"], Value::from(2));
        assert_eq!(child.attribute_source("owner"), Some("account.acme"));
        assert_eq!(
            child.attribute_source("tier"),
            Some("account.acme.region.us-west-1")
        );
        // the parent is untouched
        assert_eq!(parent.attributes()["tier"], Value::from(1));
    }
}
