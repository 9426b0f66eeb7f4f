use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use pkgrun_core::configs::load_runner_config;
use pkgrun_core::results::GENERIC_USER_ERROR;
use pkgrun_core::script_manager::{ScriptManager, ScriptManagerConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

/// pkgrun - Run scripts declared in package.json
#[derive(Parser)]
#[command(name = "pkgrun")]
#[command(about = "Run scripts declared in package.json with their pre/post hooks")]
#[command(version)]
struct Cli {
    /// Directory to run in (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    cwd: PathBuf,

    /// Manifest path, relative to --cwd
    #[arg(long, default_value = "package.json", global = true)]
    manifest: PathBuf,

    /// Runner config file providing environment overrides (last occurrence wins)
    #[arg(long = "config-file", value_name = "PATH", action = ArgAction::Append, global = true)]
    config_file: Vec<PathBuf>,

    /// Log level (error, warn, info, debug, trace); defaults to RUST_LOG or warn
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Kill any phase still running after this many seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script; without a name, list the available scripts
    Run {
        /// Script name as declared in "scripts"
        script: Option<String>,
        /// Arguments forwarded to the script after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// List scripts in declaration order
    List,
    /// Show what a run would spawn without running it
    Plan {
        /// Script name as declared in "scripts"
        script: String,
        /// Arguments that would be forwarded after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Print the JSON schema of the runner config file
    Schema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            GENERIC_USER_ERROR
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    init_tracing(cli.log_level.as_deref())?;

    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    println!(
        "{}",
        "ExperimentalWarning: Task runner is an experimental feature and might change at any time"
            .yellow()
    );

    let env_overrides = match cli.config_file.last() {
        Some(path) => match load_runner_config(path) {
            Ok(config) => {
                debug!(config = %path.display(), "Loaded runner config");
                config.env_overrides()
            }
            Err(e) => return Ok(commands::report(&e)),
        },
        None => Default::default(),
    };

    // Load the manifest once; every command works against it
    let manager = match ScriptManager::new(ScriptManagerConfig {
        working_directory: cli.cwd,
        manifest_path: cli.manifest,
        env_overrides,
        timeout: cli.timeout.map(Duration::from_secs),
    }) {
        Ok(manager) => manager,
        Err(e) => return Ok(commands::report(&e)),
    };

    let code = match cli.command {
        Commands::Run { script, args } => {
            commands::run::execute(&manager, script.as_deref(), &args).await
        }
        Commands::List => commands::list::execute(&manager),
        Commands::Plan { script, args } => commands::plan::execute(&manager, &script, &args),
        Commands::Schema => commands::schema::execute()?,
    };

    Ok(code)
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
