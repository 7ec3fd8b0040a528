mod build_cmd;
mod config;
mod files;
mod merge_cmd;
mod schedule_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;
mod validate_cmd;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use sprintgraph_core::plan::DependencyMode;

use config::{CliOverrides, SprintgraphConfig};

#[derive(Parser)]
#[command(
    name = "sprintgraph",
    version,
    about = "Turn meeting-analysis plans into task dependency graphs"
)]
struct Cli {
    /// Working hours per estimated day (overrides SPRINTGRAPH_HOURS_PER_DAY)
    #[arg(long, global = true)]
    hours_per_day: Option<u32>,

    /// Cost per hour of work (overrides SPRINTGRAPH_HOURLY_RATE)
    #[arg(long, global = true)]
    hourly_rate: Option<u32>,

    /// How to report unresolved dependency titles: silent or warn
    /// (overrides SPRINTGRAPH_DEPENDENCY_MODE)
    #[arg(long, global = true)]
    dependencies: Option<DependencyMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sprintgraph config file with default values
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Build a meeting from an analysis result (JSON)
    Build {
        /// Path to the analysis result JSON file
        file: PathBuf,
        /// Output file path (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check a plan for unresolved, duplicate, or cyclic dependencies
    Validate {
        /// Path to the analysis result JSON file
        file: PathBuf,
        /// Exit non-zero if any warning is found
        #[arg(long)]
        strict: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge analysis results into a meeting store and print it
    Merge {
        /// Seed store from a JSON array of meetings
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Analysis result JSON files, merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file path (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show earliest start/finish, critical path, and owner workload for a meeting
    Schedule {
        /// Path to a meeting JSON file (as printed by `build`)
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides SPRINTGRAPH_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides SPRINTGRAPH_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Seed store from a JSON array of meetings
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Execute the `sprintgraph init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let path = config::save_config(&config::ConfigFile::with_defaults())?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn overrides(cli: &Cli, bind: Option<String>, port: Option<u16>) -> CliOverrides {
    CliOverrides {
        hours_per_day: cli.hours_per_day,
        hourly_rate: cli.hourly_rate,
        dependency_mode: cli.dependencies,
        bind,
        port,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init { force } => cmd_init(*force),
        Commands::Build { file, output } => {
            let resolved = SprintgraphConfig::resolve(&overrides(&cli, None, None))?;
            build_cmd::run_build(file, output.as_deref(), &resolved.build)
        }
        Commands::Validate { file, strict, json } => {
            validate_cmd::run_validate(file, *strict, *json)
        }
        Commands::Merge {
            seed,
            files,
            output,
        } => {
            let resolved = SprintgraphConfig::resolve(&overrides(&cli, None, None))?;
            merge_cmd::run_merge(seed.as_deref(), files, output.as_deref(), &resolved.build)
        }
        Commands::Schedule { file, json } => {
            let resolved = SprintgraphConfig::resolve(&overrides(&cli, None, None))?;
            schedule_cmd::run_schedule(
                file,
                resolved.capacity_hours,
                resolved.build.hours_per_day,
                *json,
            )
        }
        Commands::Serve { bind, port, seed } => {
            let resolved = SprintgraphConfig::resolve(&overrides(&cli, bind.clone(), *port))?;
            let store = merge_cmd::load_store(seed.as_deref())?;
            let state = serve_cmd::AppState::new(store, resolved.build, resolved.capacity_hours);
            serve_cmd::run_serve(state, &resolved.bind, resolved.port).await
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "sprintgraph",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
