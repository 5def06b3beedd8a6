//! Execution planning: units, chain policies, and the dependency batch
//! scheduler.

pub mod policy;
pub mod scheduler;
pub mod unit;

pub use policy::ChainPolicy;
pub use scheduler::{DependencyScheduler, Roots, assert_acyclic};
pub use unit::{BUILD_DIR, Batch, ExecutionUnit, Plan, UnitKey};
