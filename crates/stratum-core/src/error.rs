//! Error taxonomy for scope matching, scheduling, and execution.

use std::fmt;

/// Errors raised while compiling scopes, matching them against roots, and
/// scheduling execution units.
#[derive(Debug, thiserror::Error)]
pub enum StratumError {
    #[error(
        "No matching scope values found.\n\
         Root '{root}' applies to the scope types {scope_types:?}.\n\
         All scopes in the project were searched ({searched}), and none matched. Please provide\n\
         \t- new scope data for the project,\n\
         \t- different scope types in the root configuration file, or\n\
         \t- new scope matches in the root configuration file."
    )]
    NoMatchingScopes {
        root: String,
        scope_types: Vec<String>,
        searched: usize,
    },

    #[error("scope address '{address}' is too long to be mapped to scope types {scope_types:?}")]
    FilterTooDeep {
        address: String,
        scope_types: Vec<String>,
    },

    #[error("cyclical dependency detected for root '{root}': {}", .path.join(" -> "))]
    CyclicDependency { root: String, path: Vec<String> },

    #[error("root '{root}' depends on '{dependency}', which cannot find a compiled scope matching {description}")]
    DependencyScopeNotFound {
        root: String,
        dependency: String,
        description: String,
    },

    #[error(
        "root '{root}' depends on '{dependency}', but {count} compiled scopes match the single scope description {description}: {}",
        .candidates.join(", ")
    )]
    DependencyScopeAmbiguous {
        root: String,
        dependency: String,
        description: String,
        count: usize,
        candidates: Vec<String>,
    },

    #[error(
        "root '{root}' depends on '{dependency}', which needs a '{scope_type}' value, \
         but scope '{address}' has none and the dependency declares no override"
    )]
    MissingInheritedScopeType {
        root: String,
        dependency: String,
        scope_type: String,
        address: String,
    },

    #[error("invalid scope pattern '{pattern}' for scope type '{scope_type}': {source}")]
    InvalidPattern {
        scope_type: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("root '{name}' isn't defined in this project")]
    UnknownRoot { name: String },

    #[error("root '{root}' declares a dependency on '{dependency}', which isn't defined in this project")]
    UnknownDependency { root: String, dependency: String },

    #[error(
        "root '{root}' uses scope types {root_types:?}, which are not a prefix of the project's scope types {project_types:?}"
    )]
    InvalidRootScopeTypes {
        root: String,
        root_types: Vec<String>,
        project_types: Vec<String>,
    },

    #[error(
        "root '{root}' has a scope match over {match_types:?}, but its scope types are {root_types:?}; \
         every scope match must name exactly the root's scope types"
    )]
    InvalidScopeMatch {
        root: String,
        match_types: Vec<String>,
        root_types: Vec<String>,
    },

    #[error(
        "root '{root}' overrides scope type '{scope_type}' for its dependency '{dependency}', \
         which only uses the scope types {dependency_types:?}"
    )]
    UnknownOverrideScopeType {
        root: String,
        dependency: String,
        scope_type: String,
        dependency_types: Vec<String>,
    },

    #[error("scope '{value}' has type '{found}' at depth {depth}, but the project expects '{expected}' there")]
    ScopeTypeOutOfOrder {
        value: String,
        found: String,
        expected: String,
        depth: usize,
    },

    #[error("scope value '{value}' of type '{scope_type}' cannot be addressed: {reason}")]
    InvalidScopeValue {
        scope_type: String,
        value: String,
        reason: &'static str,
    },

    #[error("root '{root}' has dependencies; choose whether to run none, direct, or all of them")]
    UnspecifiedChainPolicy { root: String },
}

/// Every error produced by a group of tasks, joined into one value.
#[derive(Debug, Default)]
pub struct JoinedError {
    errors: Vec<anyhow::Error>,
}

impl JoinedError {
    pub fn new(errors: Vec<anyhow::Error>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn extend(&mut self, other: JoinedError) {
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_error_is_none_when_empty() {
        assert!(JoinedError::new(Vec::new()).is_none());
    }

    #[test]
    fn joined_error_renders_one_line_per_error() {
        let joined = JoinedError::new(vec![
            anyhow::anyhow!("uh oh, 'foo' had an error"),
            anyhow::anyhow!("uh oh, 'bar' had an error"),
        ])
        .unwrap();

        let rendered = joined.to_string();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.contains("'foo'"));
        assert!(rendered.contains("'bar'"));
    }

    #[test]
    fn cyclic_dependency_names_the_path() {
        let err = StratumError::CyclicDependency {
            root: "a".to_string(),
            path: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> c -> a"));
    }
}
