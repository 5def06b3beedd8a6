//! Built-in unit actions: build a unit's directory, clean it, or run a tool
//! inside it.

mod build;
mod clean;
mod tool;

pub use build::{BuildAction, CONTEXT_FILE, INPUTS_FILE, UnitContext};
pub use clean::CleanAction;
pub use tool::ToolAction;
