//! Scope filters: scope-type names mapped to anchored value patterns.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::error::StratumError;

/// Pattern that matches any scope value.
pub const WILDCARD: &str = ".*";

/// A compiled mapping from scope-type name to a value pattern.
///
/// A filter matches a compiled scope only when it names exactly as many
/// scope types as the scope has, every named type is present in the scope,
/// and every value matches its pattern in full.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    patterns: BTreeMap<String, Regex>,
    source: BTreeMap<String, String>,
}

impl ScopeFilter {
    /// Compile a filter from raw patterns. Patterns are anchored at both ends.
    pub fn new(patterns: &BTreeMap<String, String>) -> Result<Self, StratumError> {
        let mut compiled = BTreeMap::new();
        for (scope_type, pattern) in patterns {
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                StratumError::InvalidPattern {
                    scope_type: scope_type.clone(),
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            compiled.insert(scope_type.clone(), re);
        }
        Ok(Self {
            patterns: compiled,
            source: patterns.clone(),
        })
    }

    /// A filter matching every value at the given scope types.
    pub fn wildcard<S: AsRef<str>>(scope_types: &[S]) -> Self {
        let patterns = scope_types
            .iter()
            .map(|t| (t.as_ref().to_string(), WILDCARD.to_string()))
            .collect::<BTreeMap<_, _>>();
        // the wildcard always compiles
        Self::new(&patterns).unwrap_or_else(|_| Self::empty())
    }

    fn empty() -> Self {
        Self {
            patterns: BTreeMap::new(),
            source: BTreeMap::new(),
        }
    }

    /// Number of scope types the filter constrains; a matching scope has
    /// exactly this depth.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The raw (uncompiled) patterns, keyed by scope type.
    pub fn patterns(&self) -> &BTreeMap<String, String> {
        &self.source
    }

    /// Test the filter against parallel scope type and value sequences.
    pub fn is_match(&self, scope_types: &[String], scope_values: &[String]) -> bool {
        if self.patterns.len() != scope_types.len() {
            return false;
        }
        for (scope_type, re) in &self.patterns {
            let Some(idx) = scope_types.iter().position(|t| t == scope_type) else {
                return false;
            };
            if !re.is_match(&scope_values[idx]) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.source.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn filter(pairs: &[(&str, &str)]) -> ScopeFilter {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScopeFilter::new(&map).unwrap()
    }

    #[test]
    fn depth_must_match_exactly() {
        let types = strings(&["account", "region"]);
        let values = strings(&["acme", "us-west-1"]);

        assert!(!filter(&[("account", "acme")]).is_match(&types, &values));
        assert!(filter(&[("account", "acme"), ("region", ".*")]).is_match(&types, &values));
    }

    #[test]
    fn patterns_are_anchored() {
        let types = strings(&["region"]);
        let values = strings(&["us-west-1"]);

        assert!(!filter(&[("region", "west")]).is_match(&types, &values));
        assert!(filter(&[("region", "us-.*")]).is_match(&types, &values));
    }

    #[test]
    fn unknown_scope_type_never_matches() {
        let types = strings(&["region"]);
        let values = strings(&["us-west-1"]);

        assert!(!filter(&[("zone", ".*")]).is_match(&types, &values));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let map = BTreeMap::from([("region".to_string(), "(".to_string())]);
        let err = ScopeFilter::new(&map).unwrap_err();
        assert!(matches!(err, StratumError::InvalidPattern { .. }));
    }

    #[test]
    fn wildcard_covers_every_type() {
        let f = ScopeFilter::wildcard(&["account", "region"]);
        assert_eq!(f.len(), 2);
        assert!(f.is_match(
            &strings(&["account", "region"]),
            &strings(&["anything", "at-all"])
        ));
    }
}
