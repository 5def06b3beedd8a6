//! Scope model: hierarchy levels, authored scope data, and the flattened
//! compiled scopes that roots are matched against.
//!
//! Scope data is authored as trees (`ScopeDataNode`), one level per scope
//! type, and flattened once per project load into `CompiledScopes`: one entry
//! per tree node, deduplicated and sorted by address.

pub mod compiled;
pub mod data;
pub mod filter;
pub mod matcher;
pub mod types;

pub use compiled::{CompiledScope, CompiledScopes};
pub use data::{ScopeDataNode, compile_all};
pub use filter::{ScopeFilter, WILDCARD};
pub use matcher::ScopeMatcher;
pub use types::ScopeType;
