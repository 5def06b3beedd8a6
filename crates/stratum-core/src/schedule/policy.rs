//! How far to follow root-to-root dependencies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StratumError;
use crate::root::Root;

/// Dependency chaining policy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainPolicy {
    /// Run only the requested root.
    None,
    /// Also run the requested root's direct dependencies.
    DirectOnly,
    /// Also run every dependency, direct and indirect.
    Transitive,
}

impl ChainPolicy {
    /// Settle the policy for a request against `root`.
    ///
    /// An explicit policy always wins. Without one, a root with no
    /// dependencies needs no policy; a root with dependencies is an error the
    /// caller must resolve (for example by asking the operator).
    pub fn resolve(requested: Option<ChainPolicy>, root: &Root) -> Result<Self, StratumError> {
        match requested {
            Some(policy) => Ok(policy),
            None if root.dependencies().is_empty() => Ok(ChainPolicy::None),
            None => Err(StratumError::UnspecifiedChainPolicy {
                root: root.name().to_string(),
            }),
        }
    }
}

impl fmt::Display for ChainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainPolicy::None => write!(f, "none"),
            ChainPolicy::DirectOnly => write!(f, "direct"),
            ChainPolicy::Transitive => write!(f, "all"),
        }
    }
}
