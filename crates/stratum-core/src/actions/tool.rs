use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::{debug, warn};

use crate::exec::UnitAction;
use crate::schedule::ExecutionUnit;

/// Run an external program inside each unit's built directory. Outputs the
/// program's stdout.
#[derive(Debug, Clone)]
pub struct ToolAction {
    program: String,
    args: Vec<String>,
}

impl ToolAction {
    pub fn new<S: AsRef<str>>(program: impl Into<String>, args: &[S]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl UnitAction for ToolAction {
    fn name(&self) -> &str {
        &self.program
    }

    fn run(&self, unit: &ExecutionUnit) -> anyhow::Result<String> {
        let dir = unit.destination();
        if !dir.is_dir() {
            anyhow::bail!(
                "{} has not been built yet (expected {})",
                unit,
                dir.display()
            );
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run '{}' in {}", self.program, dir.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(unit = %unit, "{line}");
        }
        for line in stderr.lines() {
            warn!(unit = %unit, "{line}");
        }

        if !output.status.success() {
            anyhow::bail!("'{}' exited with {}", self.program, output.status);
        }
        Ok(stdout)
    }
}
