use tracing::debug;

use crate::exec::UnitAction;
use crate::fs::remove_path_if_exists;
use crate::schedule::ExecutionUnit;

/// Remove each unit's build directory. Outputs the removed path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanAction;

impl UnitAction for CleanAction {
    fn name(&self) -> &str {
        "clean"
    }

    fn run(&self, unit: &ExecutionUnit) -> anyhow::Result<String> {
        let dest = unit.destination();
        if !remove_path_if_exists(&dest)? {
            debug!("Nothing to clean at {}", dest.display());
        }
        Ok(dest.display().to_string())
    }
}
