//! A bounded worker pool that runs independent tasks and joins every error.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::JoinedError;

/// A unit of work for the pool. Task bodies may block.
pub type Task<T> = Box<dyn FnOnce() -> anyhow::Result<T> + Send + 'static>;

/// Box a closure as a pool task.
pub fn task<T, F>(f: F) -> Task<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    Box::new(f)
}

/// Outputs and errors of one pool run.
#[derive(Debug)]
pub struct PoolReport<T> {
    /// Successful outputs, in completion order.
    pub outputs: Vec<T>,
    /// Every failure, joined.
    pub error: Option<JoinedError>,
}

impl<T> PoolReport<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<T>, JoinedError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.outputs),
        }
    }
}

impl PoolReport<Vec<u8>> {
    /// All byte outputs concatenated, in completion order.
    pub fn combined_output(&self) -> Vec<u8> {
        self.outputs.concat()
    }
}

/// Runs tasks with at most `worker_count` of them active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    /// A worker count of zero is treated as one.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run every task to completion. Does not stop at the first failure.
    pub async fn run<T>(&self, tasks: Vec<Task<T>>) -> PoolReport<T>
    where
        T: Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.worker_count));
        let mut set = JoinSet::new();

        for task in tasks {
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit: tokio::sync::OwnedSemaphorePermit = permits
                    .acquire_owned()
                    .await
                    .context("worker pool closed before the task could start")?;
                debug!("added task to pool");
                let result: anyhow::Result<T> = tokio::task::spawn_blocking(task)
                    .await
                    .context("pool task panicked")?;
                debug!("removing task from pool");
                result
            });
        }

        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(anyhow::Error::new(err).context("pool task failed to join")),
            }
        }

        PoolReport {
            outputs,
            error: JoinedError::new(errors),
        }
    }

    /// Blocking form of [`WorkerPool::run`], for callers outside a runtime.
    pub fn execute<T>(&self, tasks: Vec<Task<T>>) -> anyhow::Result<PoolReport<T>>
    where
        T: Send + 'static,
    {
        let runtime = build_runtime()?;
        Ok(runtime.block_on(self.run(tasks)))
    }
}

pub(crate) fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
