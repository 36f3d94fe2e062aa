//! Rollout - Entry Point
//!
//! Deploys and repairs generation-based cloud fleets without taking live
//! nodes out of service when it can be avoided.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info};

use rollout::actions::repair::parse_force_flag;
use rollout::actions::up::parse_target_generation;
use rollout::app::options::RunContext;
use rollout::app::run::{run_repair, run_up, ActionFiles};
use rollout::deploy::prompt::TerminalPrompter;
use rollout::errors::RolloutError;
use rollout::filesys::file::File;
use rollout::logs::{init_logging, LogLevel, LogOptions};
use rollout::models::generation::Generation;
use rollout::storage::layout::StorageLayout;
use rollout::storage::settings::Settings;
use rollout::utils::version_info;

/// Rollout CLI
#[derive(Parser)]
#[command(name = "rollout", version)]
#[command(about = "Seamless rollout and repair of generation-based cloud fleets", long_about = None)]
struct Cli {
    /// Directory holding settings, environments and tracker files
    #[arg(long, env = "ROLLOUT_HOME", default_value = ".rollout")]
    home: PathBuf,

    /// Settings file, defaults to <home>/settings.json
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Never prompt; abort whenever an operator decision would be needed
    #[arg(long, env = "ROLLOUT_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Log level, overrides the settings file
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create and configure the nodes of one generation, rotating live nodes
    /// out of service around their deploys
    Up {
        /// Environment to deploy
        environment: String,

        /// Environments configuration, defaults to <home>/environments.json
        #[arg(long)]
        config: Option<PathBuf>,

        /// Resource tracker, defaults to <home>/tracker.json
        #[arg(long)]
        tracker: Option<PathBuf>,

        /// Generation to deploy (active or pending)
        #[arg(long, default_value = "active", value_parser = parse_target_generation)]
        generation: Generation,
    },

    /// Make every healthy active-generation node operational
    Repair {
        /// Environment to repair
        environment: String,

        /// Environments configuration, defaults to <home>/environments.json
        #[arg(long)]
        config: Option<PathBuf>,

        /// Resource tracker, defaults to <home>/tracker.json
        #[arg(long)]
        tracker: Option<PathBuf>,

        /// Also put unhealthy nodes into service (y/n)
        #[arg(long, default_value = "n", value_parser = parse_force_flag, action = clap::ArgAction::Set)]
        force: bool,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    let layout = StorageLayout::new(&cli.home);
    let settings_file = cli
        .settings
        .clone()
        .map(File::new)
        .unwrap_or_else(|| layout.settings_file());
    let settings: Settings = match settings_file.read_json_or_default().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Unable to read settings file:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.clone().unwrap_or(settings.log_level.clone()),
        json_format: cli.json_logs || settings.json_logs,
        log_file: settings.log_to_file.then(|| layout.log_file()),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let interactive = settings.interactive && !cli.non_interactive;
    let prompter = TerminalPrompter;

    let result = match cli.command {
        Commands::Up {
            environment,
            config,
            tracker,
            generation,
        } => {
            let ctx = RunContext::new(environment, generation)
                .with_interactive(interactive)
                .with_convergence(settings.convergence.clone());
            let files = action_files(&layout, config, tracker);
            info!("Running up with options: {:?}", ctx);
            run_up(&ctx, &files, &prompter)
                .await
                .map(|report| report.summary())
        }
        Commands::Repair {
            environment,
            config,
            tracker,
            force,
        } => {
            let ctx = RunContext::new(environment, Generation::Active)
                .with_interactive(interactive)
                .with_convergence(settings.convergence.clone());
            let files = action_files(&layout, config, tracker);
            info!("Running repair with options: {:?}", ctx);
            run_repair(&ctx, &files, &prompter, force)
                .await
                .map(|report| report.summary())
        }
        Commands::Version => Ok(String::new()),
    };

    report(result)
}

fn action_files(
    layout: &StorageLayout,
    config: Option<PathBuf>,
    tracker: Option<PathBuf>,
) -> ActionFiles {
    ActionFiles {
        environments: config
            .map(File::new)
            .unwrap_or_else(|| layout.environments_file()),
        tracker: tracker.map(File::new).unwrap_or_else(|| layout.tracker_file()),
    }
}

fn report(result: Result<String, RolloutError>) -> ExitCode {
    match result {
        Ok(summary) => {
            println!("{}", summary.green());
            ExitCode::SUCCESS
        }
        Err(e) if e.is_abort() => {
            error!("Aborted: {}", e);
            eprintln!("{} {}", "Aborted:".red().bold(), e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Failed: {}", e);
            eprintln!("{} {}", "Failed:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
