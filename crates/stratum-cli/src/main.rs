//! Stratum - build orchestrator for a monorepo of roots
//!
//! Usage:
//!   stratum root build vpc acme.us-west-1 --all
//!   stratum root run vpc -- terraform plan
//!   stratum scope list
//!   stratum project graph-roots

mod interactive;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stratum_core::commands::{DEFAULT_WORKERS, RootCommand, RootOptions};
use stratum_core::exec::{DRY_RUN_CAVEAT, ExecutionReport};
use stratum_core::project::Project;
use stratum_core::root::Root;
use stratum_core::schedule::ChainPolicy;
use stratum_core::scope::{CompiledScope, ScopeType};

#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Build roots once per matching scope", long_about = None)]
struct Cli {
    /// Project configuration file
    #[arg(long, global = true, default_value = "stratum.toml")]
    project: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum units run at once
    #[arg(short, long, global = true, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, clean, run, or inspect roots
    Root(RootArgs),

    /// Inspect the project's scope types and compiled scopes
    Scope(ScopeArgs),

    /// Commands relating to the whole project
    Project(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    #[command(subcommand)]
    command: ProjectSubcommand,
}

#[derive(Subcommand)]
enum ProjectSubcommand {
    /// Print a DOT-format graph of the project's roots and their dependencies
    GraphRoots,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct RootArgs {
    #[command(subcommand)]
    command: RootSubcommand,
}

#[derive(Subcommand)]
enum RootSubcommand {
    /// Build a root into one directory per matching scope
    Build(ChainedArgs),

    /// Remove a root's build directories
    Clean(TargetArgs),

    /// Run a program in each of a root's built directories
    Run {
        #[command(flatten)]
        args: ChainedArgs,

        /// Program and arguments to run (after --)
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// List the project's roots
    List {
        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a root's configuration and matching scopes
    Show {
        /// Root name
        root: String,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Root name
    root: String,

    /// Scope addresses to narrow to (e.g. "acme.us-west-1" or "account.acme.region.*")
    scopes: Vec<String>,

    /// Show what would run without running it
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct ChainedArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    chain: ChainArgs,
}

/// How far to follow dependencies. Prompted for when omitted and the root
/// has any.
#[derive(Args)]
#[group(required = false, multiple = false)]
struct ChainArgs {
    /// Don't run any dependencies
    #[arg(long)]
    none: bool,

    /// Also run direct dependencies
    #[arg(long)]
    one: bool,

    /// Also run every dependency, direct and indirect
    #[arg(long)]
    all: bool,
}

impl ChainArgs {
    fn policy(&self) -> Option<ChainPolicy> {
        if self.none {
            Some(ChainPolicy::None)
        } else if self.one {
            Some(ChainPolicy::DirectOnly)
        } else if self.all {
            Some(ChainPolicy::Transitive)
        } else {
            None
        }
    }
}

#[derive(Args)]
struct ScopeArgs {
    #[command(subcommand)]
    command: ScopeSubcommand,
}

#[derive(Subcommand)]
enum ScopeSubcommand {
    /// List the project's scope types, in hierarchy order
    List {
        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the compiled scopes matching an address, with their attributes
    Show {
        /// Scope address (e.g. "acme.us-west-1")
        address: String,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "stratum=debug,info"
    } else {
        "stratum=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let project = Arc::new(Project::load(&cli.project)?);
    match cli.command {
        Commands::Root(args) => run_root(project, args.command, cli.workers),
        Commands::Scope(args) => run_scope(&project, args.command),
        Commands::Project(args) => match args.command {
            ProjectSubcommand::GraphRoots => {
                println!("{}", project.root_dependency_graph());
                Ok(())
            }
        },
    }
}

fn run_root(project: Arc<Project>, command: RootSubcommand, workers: usize) -> Result<()> {
    let cmd = RootCommand::new(Arc::clone(&project));
    match command {
        RootSubcommand::Build(args) => {
            let options = chained_options(&project, &args, workers)?;
            let report = cmd.build(&options)?;
            finish(report, args.target.format)
        }
        RootSubcommand::Clean(args) => {
            let options = target_options(&args, workers);
            let report = cmd.clean(&options)?;
            finish(report, args.format)
        }
        RootSubcommand::Run { args, command } => {
            let options = chained_options(&project, &args, workers)?;
            let (program, program_args) = command
                .split_first()
                .ok_or_else(|| anyhow::anyhow!("Missing program to run"))?;
            let report = cmd.run(&options, program, program_args)?;
            finish(report, args.target.format)
        }
        RootSubcommand::List { format } => print_roots(&project, format),
        RootSubcommand::Show { root, format } => print_root(&project, &root, format),
    }
}

fn target_options(args: &TargetArgs, workers: usize) -> RootOptions {
    RootOptions::new(&args.root)
        .with_scopes(&args.scopes)
        .with_dry_run(args.dry_run)
        .with_workers(workers)
}

fn chained_options(project: &Project, args: &ChainedArgs, workers: usize) -> Result<RootOptions> {
    let mut options = target_options(&args.target, workers);
    let root = project.root(&args.target.root)?;
    let chain = match args.chain.policy() {
        Some(policy) => Some(policy),
        None if !root.dependencies().is_empty() && interactive::can_prompt() => {
            Some(interactive::prompt_chain_policy(root)?)
        }
        None => None,
    };
    if let Some(chain) = chain {
        options = options.with_chain(chain);
    }
    Ok(options)
}

/// Print whatever completed, then fail if anything did.
fn finish(report: ExecutionReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_outputs_table(&report),
        OutputFormat::Json => {
            let outputs = report.sorted_outputs();
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
    }
    if report.dry_run {
        eprintln!("{}", style(DRY_RUN_CAVEAT).yellow());
    }
    report.into_result()?;
    Ok(())
}

fn print_outputs_table(report: &ExecutionReport) {
    if report.outputs.is_empty() {
        println!("Nothing was run.");
        return;
    }

    println!("{:<20} {:<40} Output", "Root", "Scope");
    println!("{}", "-".repeat(80));

    for output in report.sorted_outputs() {
        let mut lines = output.output.lines();
        let first = lines.next().unwrap_or("");
        println!(
            "{:<20} {:<40} {}",
            output.unit.root, output.unit.address, first
        );
        for line in lines {
            println!("{:<20} {:<40} {}", "", "", line);
        }
    }
}

fn print_roots(project: &Project, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if project.roots().is_empty() {
                println!("No roots found in project '{}'.", project.id());
                return Ok(());
            }
            println!("{:<20} {:<30} Dependencies", "Name", "Scope types");
            println!("{}", "-".repeat(70));
            for root in project.roots().values() {
                println!(
                    "{:<20} {:<30} {}",
                    root.name(),
                    root.scope_types().join("."),
                    dependency_names(root)
                );
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = project
                .roots()
                .values()
                .map(|root| root_json(root))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_root(project: &Project, name: &str, format: OutputFormat) -> Result<()> {
    let root = project.root(name)?;
    let scopes = project
        .matcher()
        .determine_matching_scopes(root, &[] as &[&str])?;

    match format {
        OutputFormat::Table => {
            println!("{} {}", style("Root:").bold(), root.name());
            println!("  Directory:    {}", root.dir().display());
            println!("  Scope types:  {}", root.scope_types().join("."));
            println!("  Dependencies: {}", dependency_names(root));
            println!("  Scopes ({}):", scopes.len());
            for scope in &scopes {
                println!("    {}", scope.address());
            }
        }
        OutputFormat::Json => {
            let mut output = root_json(root);
            output["scopes"] = serde_json::json!(scopes.addresses());
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_scope(project: &Project, command: ScopeSubcommand) -> Result<()> {
    let (scopes, format) = match command {
        ScopeSubcommand::List { format } => return print_scope_types(project, format),
        ScopeSubcommand::Show { address, format } => (project.scopes_matching(&address)?, format),
    };
    info!(
        "{} {} found",
        scopes.len(),
        if scopes.len() == 1 { "scope" } else { "scopes" }
    );

    match format {
        OutputFormat::Table => {
            if scopes.is_empty() {
                println!("No matching scopes.");
                return Ok(());
            }
            for scope in &scopes {
                println!("{}", scope.address());
                for (key, value) in scope.attributes() {
                    let source = scope.attribute_source(key).unwrap_or("-");
                    println!("  {key} = {value}  ({})", style(source).dim());
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<&CompiledScope> = scopes.iter().map(|scope| &**scope).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_scope_types(project: &Project, format: OutputFormat) -> Result<()> {
    let scope_types = project.scope_types();
    match format {
        OutputFormat::Table => {
            info!(
                "There {} {} scope {} in the project {}",
                if scope_types.len() == 1 { "is" } else { "are" },
                scope_types.len(),
                if scope_types.len() == 1 { "type" } else { "types" },
                project.id()
            );
            print!("{}", scope_types_table(scope_types));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(scope_types)?);
        }
    }
    Ok(())
}

fn scope_types_table(scope_types: &[ScopeType]) -> String {
    let mut table = format!("{:<20} {:<12} Description\n", "Name", "Default");
    table.push_str(&"-".repeat(60));
    table.push('\n');
    for scope_type in scope_types {
        table.push_str(&format!(
            "{:<20} {:<12} {}\n",
            scope_type.name,
            scope_type.default.as_deref().unwrap_or("-"),
            scope_type.description.as_deref().unwrap_or("-")
        ));
    }
    table
}

fn dependency_names(root: &Root) -> String {
    if root.dependencies().is_empty() {
        return "-".to_string();
    }
    root.dependencies()
        .iter()
        .map(|d| d.root.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn root_json(root: &Root) -> serde_json::Value {
    serde_json::json!({
        "name": root.name(),
        "dir": root.dir(),
        "scope_types": root.scope_types(),
        "dependencies": root.dependencies(),
        "scope_matches": root.scope_matches(),
        "inputs": root.inputs(),
    })
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, ProjectSubcommand, ScopeSubcommand, scope_types_table};
    use clap::Parser;
    use stratum_core::scope::ScopeType;

    #[test]
    fn scope_types_table_lists_hierarchy_in_order() {
        let table = scope_types_table(&[
            ScopeType::new("account").with_description("Cloud account"),
            ScopeType::new("region"),
        ]);
        let rows: Vec<&str> = table.lines().skip(2).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("account"));
        assert!(rows[0].ends_with("Cloud account"));
        assert!(rows[1].starts_with("region"));
        assert!(rows[1].ends_with('-'));
    }

    #[test]
    fn graph_roots_parses() {
        let cli = Cli::try_parse_from(["stratum", "project", "graph-roots"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Project(args) if matches!(args.command, ProjectSubcommand::GraphRoots)
        ));
    }

    #[test]
    fn scope_list_parses_with_global_flags() {
        let cli =
            Cli::try_parse_from(["stratum", "scope", "list", "--project", "infra/stratum.toml"])
                .unwrap();
        assert_eq!(cli.project.to_str(), Some("infra/stratum.toml"));
        let Commands::Scope(args) = cli.command else {
            panic!("expected the scope command");
        };
        assert!(matches!(args.command, ScopeSubcommand::List { .. }));
    }

    #[test]
    fn chain_flags_are_exclusive() {
        let result = Cli::try_parse_from(["stratum", "root", "build", "vpc", "--one", "--all"]);
        assert!(result.is_err());
    }
}
