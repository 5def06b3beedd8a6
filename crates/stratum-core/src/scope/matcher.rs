//! Narrowing the project's compiled scopes to the ones a request targets.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::compiled::{CompiledScope, CompiledScopes};
use super::filter::{ScopeFilter, WILDCARD};
use super::types::{ScopeType, type_names};
use crate::error::StratumError;
use crate::root::Root;

/// Matches roots and user-supplied addresses against a project's compiled
/// scopes.
#[derive(Debug, Clone, Copy)]
pub struct ScopeMatcher<'a> {
    compiled_scopes: &'a CompiledScopes,
    scope_types: &'a [ScopeType],
}

impl<'a> ScopeMatcher<'a> {
    pub fn new(compiled_scopes: &'a CompiledScopes, scope_types: &'a [ScopeType]) -> Self {
        Self {
            compiled_scopes,
            scope_types,
        }
    }

    pub fn compiled_scopes(&self) -> &'a CompiledScopes {
        self.compiled_scopes
    }

    /// The compiled scopes that (a) match at least one of the root's scope
    /// matches and (b) match at least one of the given addresses, if any are
    /// given.
    ///
    /// A root without scope matches is treated as matching every value at
    /// each of its own scope types.
    pub fn determine_matching_scopes<S: AsRef<str>>(
        &self,
        root: &Root,
        addresses: &[S],
    ) -> Result<CompiledScopes, StratumError> {
        let root_filters = if root.scope_matches().is_empty() {
            vec![ScopeFilter::wildcard(root.scope_types())]
        } else {
            root.scope_matches()
                .iter()
                .map(|m| ScopeFilter::new(&m.scope_types))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut matching = CompiledScopes::new();
        for filter in &root_filters {
            matching.extend(self.compiled_scopes.matching(filter));
        }
        let mut matching = matching.deduplicate().sorted();

        if !addresses.is_empty() {
            let user_filters = addresses
                .iter()
                .map(|a| self.make_filter(a.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                filters = ?user_filters.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "filtering the root's scopes"
            );
            matching = matching
                .into_iter()
                .filter(|scope| user_filters.iter().any(|f| scope.matches(f)))
                .collect();
        }

        if matching.is_empty() {
            return Err(StratumError::NoMatchingScopes {
                root: root.name().to_string(),
                scope_types: root.scope_types().to_vec(),
                searched: self.compiled_scopes.len(),
            });
        }
        Ok(matching)
    }

    /// Parse a user-supplied address into a filter.
    ///
    /// The address may interleave scope types and values
    /// (`account.acme.region.us-west-1`) or give just the values
    /// (`acme.us-west-1`). A `*` value matches anything.
    pub fn make_filter(&self, address: &str) -> Result<ScopeFilter, StratumError> {
        ScopeFilter::new(&self.parse_address(address)?)
    }

    /// The scope-type to pattern mapping an address describes.
    pub fn parse_address(&self, address: &str) -> Result<BTreeMap<String, String>, StratumError> {
        let mut parts: Vec<&str> = address.split('.').collect();

        if parts.len() % 2 == 0 && self.is_collated(&parts) {
            parts = parts.into_iter().skip(1).step_by(2).collect();
        }
        debug!(address, ?parts, "parts after decollation");

        if parts.len() > self.scope_types.len() {
            return Err(StratumError::FilterTooDeep {
                address: address.to_string(),
                scope_types: type_names(self.scope_types),
            });
        }

        Ok(parts
            .into_iter()
            .zip(self.scope_types)
            .map(|(value, scope_type)| {
                let pattern = if value == "*" { WILDCARD } else { value };
                (scope_type.name.clone(), pattern.to_string())
            })
            .collect())
    }

    fn is_collated(&self, parts: &[&str]) -> bool {
        parts
            .iter()
            .step_by(2)
            .enumerate()
            .all(|(i, part)| self.scope_types.get(i).is_some_and(|t| t.name == *part))
    }

    /// Map a dependency edge onto a concrete scope.
    ///
    /// For each of the ancestor root's scope types, the dependency's override
    /// (if declared) wins; otherwise the descendant's value at that scope type
    /// is inherited. Exactly one compiled scope must match.
    pub fn resolve_dependency_scope(
        &self,
        descendant: &str,
        ancestor: &Root,
        descendant_scope: &CompiledScope,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Arc<CompiledScope>, StratumError> {
        let mut description = BTreeMap::new();
        let mut patterns = BTreeMap::new();
        for scope_type in ancestor.scope_types() {
            if let Some(custom) = overrides.get(scope_type) {
                description.insert(scope_type.clone(), custom.clone());
                patterns.insert(scope_type.clone(), custom.clone());
                continue;
            }
            let value = descendant_scope.value_of(scope_type).ok_or_else(|| {
                StratumError::MissingInheritedScopeType {
                    root: descendant.to_string(),
                    dependency: ancestor.name().to_string(),
                    scope_type: scope_type.clone(),
                    address: descendant_scope.address(),
                }
            })?;
            description.insert(scope_type.clone(), value.to_string());
            patterns.insert(scope_type.clone(), regex::escape(value));
        }

        let filter = ScopeFilter::new(&patterns)?;
        trace!(%filter, "searching compiled scopes for a dependency match");
        let matches = self.compiled_scopes.matching(&filter);

        let describe = || format!("{description:?}");
        if matches.len() > 1 {
            return Err(StratumError::DependencyScopeAmbiguous {
                root: descendant.to_string(),
                dependency: ancestor.name().to_string(),
                description: describe(),
                count: matches.len(),
                candidates: matches.addresses(),
            });
        }
        let found = matches.into_iter().next().ok_or_else(|| {
            StratumError::DependencyScopeNotFound {
                root: descendant.to_string(),
                dependency: ancestor.name().to_string(),
                description: describe(),
            }
        })?;
        trace!(scope = %found, "match found");
        Ok(found)
    }
}
