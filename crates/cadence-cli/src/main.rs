mod cmd;
mod output;
mod root;

use cadence_core::CadenceError;
use clap::{Parser, Subcommand};
use cmd::{amend::AmendSubcommand, plan::PlanSubcommand, task::TaskSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cadence",
    about = "Plan-driven delivery coordination — lock a plan, work tasks one at a time, amend with an audit trail",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "CADENCE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the .claude/ store in the current project
    Init,

    /// Create, inspect, lock, and archive plans
    Plan {
        #[command(subcommand)]
        subcommand: PlanSubcommand,
    },

    /// Work tasks through their lifecycle
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Amend a locked plan (every change is logged with a reason)
    Amend {
        #[command(subcommand)]
        subcommand: AmendSubcommand,
    },

    /// Show the active plan's progress
    Status,

    /// Push every task's current state to the external tracker
    Sync,

    /// Show the detected issue-tracking platform
    Platform,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Plan { subcommand } => cmd::plan::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Amend { subcommand } => cmd::amend::run(&root, subcommand, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Sync => cmd::sync::run(&root, cli.json),
        Commands::Platform => cmd::platform::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        // User errors (bad input, state conflicts) exit 1; corruption and
        // I/O failures exit 2.
        let code = match e.downcast_ref::<CadenceError>() {
            Some(ce) if ce.is_user_error() => 1,
            _ => 2,
        };
        std::process::exit(code);
    }
}
