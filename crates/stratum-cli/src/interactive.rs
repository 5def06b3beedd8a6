//! Interactive prompts for choices the command line left open.

use anyhow::Result;
use console::{Term, style};
use dialoguer::{Select, theme::ColorfulTheme};

use stratum_core::root::Root;
use stratum_core::schedule::ChainPolicy;

/// Whether prompting is possible at all.
pub fn can_prompt() -> bool {
    Term::stdout().is_term() && Term::stderr().is_term()
}

/// Ask whether to run the root's dependencies too.
pub fn prompt_chain_policy(root: &Root) -> Result<ChainPolicy> {
    let dependencies: Vec<&str> = root
        .dependencies()
        .iter()
        .map(|d| d.root.as_str())
        .collect();
    eprintln!(
        "{} {} depends on {}",
        style("?").yellow().bold(),
        style(root.name()).bold(),
        dependencies.join(", ")
    );

    let options = [
        "No, don't run any dependencies",
        "Yes, but just the direct dependencies",
        "Yes, and run all dependencies (direct and indirect)",
    ];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Do you want to run the dependencies as well?")
        .items(&options)
        .default(0)
        .interact()?;

    Ok(match selection {
        0 => ChainPolicy::None,
        1 => ChainPolicy::DirectOnly,
        _ => ChainPolicy::Transitive,
    })
}
