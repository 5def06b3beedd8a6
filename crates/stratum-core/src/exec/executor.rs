//! Runs a plan batch by batch through the worker pool.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::pool::{Task, WorkerPool, build_runtime};
use crate::error::JoinedError;
use crate::schedule::{ExecutionUnit, Plan, UnitKey};

/// Shown after every dry run.
pub const DRY_RUN_CAVEAT: &str = "Note: This was a dry-run, so stratum can't guarantee to take \
     exactly these actions if you re-run without the dry-run flag enabled.";

/// Something to do to each execution unit (build it, clean it, run a tool
/// in it). The executor knows nothing else about it.
pub trait UnitAction: Send + Sync + 'static {
    /// Short name used in logs and dry-run reports.
    fn name(&self) -> &str;

    fn run(&self, unit: &ExecutionUnit) -> anyhow::Result<String>;
}

/// A [`UnitAction`] backed by a closure.
pub struct FnAction<F> {
    name: String,
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn(&ExecutionUnit) -> anyhow::Result<String> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> UnitAction for FnAction<F>
where
    F: Fn(&ExecutionUnit) -> anyhow::Result<String> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, unit: &ExecutionUnit) -> anyhow::Result<String> {
        (self.f)(unit)
    }
}

/// What one unit produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutput {
    pub unit: UnitKey,
    pub output: String,
}

/// The result of executing a plan. On failure, outputs of every unit that
/// succeeded before the failing batch finished are still present.
#[derive(Debug)]
pub struct ExecutionReport {
    /// Per-unit outputs, in completion order.
    pub outputs: Vec<UnitOutput>,
    pub dry_run: bool,
    pub batches_completed: usize,
    pub failure: Option<BatchFailure>,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub batch: usize,
    pub error: JoinedError,
}

/// A failed execution, carrying whatever succeeded.
#[derive(Debug, thiserror::Error)]
#[error("batch {batch} failed, so later batches were not run:\n{error}")]
pub struct ExecutionFailure {
    pub batch: usize,
    #[source]
    pub error: JoinedError,
    pub outputs: Vec<UnitOutput>,
}

impl ExecutionReport {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    /// Outputs ordered by unit identity rather than completion order.
    pub fn sorted_outputs(&self) -> Vec<&UnitOutput> {
        let mut outputs: Vec<&UnitOutput> = self.outputs.iter().collect();
        outputs.sort_by(|a, b| a.unit.cmp(&b.unit));
        outputs
    }

    pub fn into_result(self) -> Result<Vec<UnitOutput>, ExecutionFailure> {
        match self.failure {
            None => Ok(self.outputs),
            Some(BatchFailure { batch, error }) => Err(ExecutionFailure {
                batch,
                error,
                outputs: self.outputs,
            }),
        }
    }
}

/// Walks a plan's batches in order. Units within a batch run concurrently;
/// a batch starts only after the previous one has fully completed, and only
/// if nothing in it failed.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    pool: WorkerPool,
    dry_run: bool,
}

impl Executor {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self, plan: &Plan, action: Arc<dyn UnitAction>) -> ExecutionReport {
        let mut report = ExecutionReport {
            outputs: Vec::new(),
            dry_run: self.dry_run,
            batches_completed: 0,
            failure: None,
        };

        for (index, batch) in plan.batches().iter().enumerate() {
            if self.dry_run {
                for unit in batch {
                    info!("would have run {} on {}", action.name(), unit);
                    report.outputs.push(UnitOutput {
                        unit: unit.key(),
                        output: format!("would run {} on {}", action.name(), unit),
                    });
                }
                report.batches_completed += 1;
                continue;
            }

            debug!(batch = index, units = batch.len(), "starting batch");
            let tasks: Vec<Task<UnitOutput>> = batch
                .iter()
                .map(|unit| unit_task(unit.clone(), Arc::clone(&action)))
                .collect();
            let pool_report = self.pool.run(tasks).await;
            report.outputs.extend(pool_report.outputs);

            if let Some(error) = pool_report.error {
                warn!(batch = index, failures = error.len(), "batch failed");
                report.failure = Some(BatchFailure {
                    batch: index,
                    error,
                });
                break;
            }
            report.batches_completed += 1;
        }

        if self.dry_run {
            info!("{DRY_RUN_CAVEAT}");
        }
        report
    }

    /// Blocking form of [`Executor::run`], for callers outside a runtime.
    pub fn execute(
        &self,
        plan: &Plan,
        action: Arc<dyn UnitAction>,
    ) -> anyhow::Result<ExecutionReport> {
        let runtime = build_runtime()?;
        Ok(runtime.block_on(self.run(plan, action)))
    }
}

fn unit_task(unit: ExecutionUnit, action: Arc<dyn UnitAction>) -> Task<UnitOutput> {
    Box::new(move || {
        debug!("running {} on {}", action.name(), unit);
        let output = action
            .run(&unit)
            .map_err(|err| err.context(format!("{} failed on {}", action.name(), unit)))?;
        Ok(UnitOutput {
            unit: unit.key(),
            output,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::Root;
    use crate::scope::CompiledScope;
    use std::sync::Mutex;

    fn unit(root: &str, account: &str) -> ExecutionUnit {
        ExecutionUnit::new(
            Arc::new(Root::new(root, &["account"])),
            Arc::new(CompiledScope::new(&["account"], &[account])),
        )
    }

    fn two_batch_plan() -> Plan {
        Plan::new(vec![
            vec![unit("vpc", "acme"), unit("vpc", "globex")],
            vec![unit("web", "acme")],
        ])
    }

    #[test]
    fn dry_run_runs_nothing() {
        let calls = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&calls);
        let action = FnAction::new("build", move |_unit: &ExecutionUnit| {
            *seen.lock().unwrap() += 1;
            Ok(String::new())
        });

        let report = Executor::new(WorkerPool::new(2))
            .with_dry_run(true)
            .execute(&two_batch_plan(), Arc::new(action))
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(report.dry_run);
        assert_eq!(report.batches_completed, 2);
        assert_eq!(report.outputs.len(), 3);
        assert!(report.outputs[0].output.starts_with("would run build on"));
    }

    #[test]
    fn later_batches_see_earlier_batches_finished() {
        let finished = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = Arc::clone(&finished);
        let action = FnAction::new("build", move |unit: &ExecutionUnit| {
            if unit.root().name() == "web" {
                assert_eq!(log.lock().unwrap().len(), 2);
            }
            log.lock().unwrap().push(unit.to_string());
            Ok(unit.to_string())
        });

        let report = Executor::new(WorkerPool::new(4))
            .execute(&two_batch_plan(), Arc::new(action))
            .unwrap();

        assert!(report.is_ok());
        assert_eq!(report.batches_completed, 2);
        let last = finished.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last, "web (account.acme)");
    }

    #[test]
    fn failed_batch_stops_the_plan() {
        let action = FnAction::new("build", |unit: &ExecutionUnit| {
            if unit.scope().values_path() == "globex" {
                anyhow::bail!("uh oh");
            }
            Ok(unit.to_string())
        });

        let report = Executor::new(WorkerPool::new(2))
            .execute(&two_batch_plan(), Arc::new(action))
            .unwrap();

        assert!(!report.is_ok());
        assert_eq!(report.batches_completed, 0);
        let failure = report.into_result().unwrap_err();
        assert_eq!(failure.batch, 0);
        assert_eq!(failure.error.len(), 1);
        assert!(failure.error.to_string().contains("build failed on vpc (account.globex)"));
        // the sibling in the failing batch still completed
        assert_eq!(failure.outputs.len(), 1);
        assert_eq!(failure.outputs[0].unit.address, "account.acme");
    }

    #[test]
    fn sorted_outputs_ignore_completion_order() {
        let report = ExecutionReport {
            outputs: vec![
                UnitOutput {
                    unit: unit("web", "acme").key(),
                    output: String::new(),
                },
                UnitOutput {
                    unit: unit("vpc", "globex").key(),
                    output: String::new(),
                },
                UnitOutput {
                    unit: unit("vpc", "acme").key(),
                    output: String::new(),
                },
            ],
            dry_run: false,
            batches_completed: 2,
            failure: None,
        };

        let keys: Vec<String> = report
            .sorted_outputs()
            .iter()
            .map(|o| o.unit.to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "vpc (account.acme)",
                "vpc (account.globex)",
                "web (account.acme)"
            ]
        );
    }
}
