mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agent-eval",
    about = "Run LLM agent scenarios and judge their output against per-domain rubrics",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .eval/ or .git/)
    #[arg(long, global = true, env = "AGENT_EVAL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress (info level) to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold .eval/config.yaml, an example scenario and starter rubrics
    Init,

    /// Check that the LLM tool is on PATH and the config is sound
    Check,

    /// Run scenarios: agent, then judge, then record
    Run {
        /// Scenario YAML files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// Judge an existing agent output without running the agent
    Judge {
        /// Scenario YAML file the output was produced for
        scenario: PathBuf,

        /// File containing the agent output
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Check => cmd::check::run(&root, cli.json),
        Commands::Run { scenarios } => cmd::run::run(&root, &scenarios, cli.json),
        Commands::Judge { scenario, output } => {
            cmd::judge::run(&root, &scenario, &output, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
