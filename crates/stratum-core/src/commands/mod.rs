//! Root commands: build, clean, or run a tool against a root at some scopes.
//!
//! Each command settles the chain policy, plans the request through the
//! project's scheduler, and hands the plan to the executor.

use std::sync::Arc;

use tracing::info;

use crate::actions::{BuildAction, CleanAction, ToolAction};
use crate::exec::{ExecutionReport, Executor, UnitAction, WorkerPool};
use crate::project::Project;
use crate::schedule::{ChainPolicy, Plan};

/// Default number of units run at once.
pub const DEFAULT_WORKERS: usize = 4;

/// Options for a root command
#[derive(Debug, Clone)]
pub struct RootOptions {
    /// Root to act on
    pub root: String,
    /// Scope addresses to narrow to; all of the root's scopes if empty
    pub scopes: Vec<String>,
    /// How far to follow dependencies; required when the root has any
    pub chain: Option<ChainPolicy>,
    /// Report what would run without running it
    pub dry_run: bool,
    /// Maximum units run at once
    pub workers: usize,
}

impl RootOptions {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            scopes: Vec::new(),
            chain: None,
            dry_run: false,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_scopes<S: AsRef<str>>(mut self, scopes: &[S]) -> Self {
        self.scopes = scopes.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_chain(mut self, chain: ChainPolicy) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Runs actions against a project's roots.
#[derive(Debug, Clone)]
pub struct RootCommand {
    project: Arc<Project>,
}

impl RootCommand {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Plan a request without running it.
    pub fn plan(&self, options: &RootOptions) -> anyhow::Result<Plan> {
        let root = self.project.root(&options.root)?;
        let policy = ChainPolicy::resolve(options.chain, root)?;
        info!(
            root = %options.root,
            chain = %policy,
            scopes = ?options.scopes,
            "planning"
        );
        Ok(self.project.plan(&options.root, &options.scopes, policy)?)
    }

    /// Build every planned unit into its destination directory.
    pub fn build(&self, options: &RootOptions) -> anyhow::Result<ExecutionReport> {
        self.execute(options, Arc::new(BuildAction))
    }

    /// Remove the requested units' build directories. Dependencies are never
    /// cleaned.
    pub fn clean(&self, options: &RootOptions) -> anyhow::Result<ExecutionReport> {
        let options = options.clone().with_chain(ChainPolicy::None);
        self.execute(&options, Arc::new(CleanAction))
    }

    /// Run an external program in every planned unit's built directory.
    pub fn run<S: AsRef<str>>(
        &self,
        options: &RootOptions,
        program: &str,
        args: &[S],
    ) -> anyhow::Result<ExecutionReport> {
        self.execute(options, Arc::new(ToolAction::new(program, args)))
    }

    /// Plan and run an arbitrary action.
    pub fn execute(
        &self,
        options: &RootOptions,
        action: Arc<dyn UnitAction>,
    ) -> anyhow::Result<ExecutionReport> {
        let plan = self.plan(options)?;
        info!(
            batches = plan.len(),
            units = plan.unit_count(),
            "running {}",
            action.name()
        );
        Executor::new(WorkerPool::new(options.workers))
            .with_dry_run(options.dry_run)
            .execute(&plan, action)
    }
}
