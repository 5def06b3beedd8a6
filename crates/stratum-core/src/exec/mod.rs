//! Execution: the bounded worker pool and the batch executor built on it.

pub mod executor;
pub mod pool;

pub use executor::{
    BatchFailure, DRY_RUN_CAVEAT, ExecutionFailure, ExecutionReport, Executor, FnAction,
    UnitAction, UnitOutput,
};
pub use pool::{PoolReport, Task, WorkerPool, task};
