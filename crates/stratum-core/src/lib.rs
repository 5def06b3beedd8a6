//! Stratum Core Library
//!
//! Builds a monorepo of roots once per matching scope: scope data is
//! compiled into flat scope permutations, each request is matched against
//! them, expanded along root dependencies into ordered batches, and run
//! through a bounded worker pool.

pub mod actions;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod project;
pub mod root;
pub mod schedule;
pub mod scope;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{JoinedError, StratumError};

    // Scopes
    pub use crate::scope::{
        CompiledScope, CompiledScopes, ScopeDataNode, ScopeFilter, ScopeMatcher, ScopeType,
    };

    // Roots and projects
    pub use crate::project::Project;
    pub use crate::root::{Root, RootDependency, ScopeMatch};

    // Scheduling
    pub use crate::schedule::{ChainPolicy, DependencyScheduler, ExecutionUnit, Plan, UnitKey};

    // Execution
    pub use crate::actions::{BuildAction, CleanAction, ToolAction};
    pub use crate::commands::{RootCommand, RootOptions};
    pub use crate::exec::{
        ExecutionFailure, ExecutionReport, Executor, FnAction, UnitAction, UnitOutput, WorkerPool,
    };
}
