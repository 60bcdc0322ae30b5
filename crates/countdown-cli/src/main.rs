//! Countdown CLI
//!
//! Command-line front end for the countdown timer service.

mod commands;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use countdown_core::models::ConfigOverrides;
use countdown_core::storage::{init_config_dir, ConfigStorage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "countdown")]
#[command(about = "Countdown timer client", long_about = None)]
struct Args {
    /// Directory holding config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// REST API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Push channel URL (ws:// or wss://)
    #[arg(long, global = true)]
    push_url: Option<String>,

    /// Do not open the push channel
    #[arg(long, global = true)]
    no_push: bool,

    /// Log level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how a duration input is read
    Parse { input: String },

    /// List a project's timers
    Project { project: String },

    /// Create a timer
    Create {
        project: String,
        #[command(flatten)]
        form: TimerForm,
    },

    /// Edit a timer
    Update {
        project: String,
        timer: String,
        #[command(flatten)]
        form: TimerForm,
    },

    /// Delete a timer
    Delete { project: String, timer: String },

    /// Start or resume a timer
    Start { project: String, timer: String },

    /// Pause a running timer
    Pause { project: String, timer: String },

    /// Reset a timer to its full duration
    Reset { project: String, timer: String },

    /// Make a timer the project's selected timer
    Select { project: String, timer: String },

    /// Clear the project's selected timer
    Deselect { project: String },

    /// Follow one timer until Ctrl-C
    Watch { project: String, timer: String },

    /// Follow whichever timer is selected until Ctrl-C
    WatchSelected { project: String },

    /// Print the effective configuration
    Config,
}

#[derive(ClapArgs, Debug)]
pub struct TimerForm {
    #[arg(long)]
    name: String,

    /// Duration such as 10m, 1h30m, 10:00 or 600
    #[arg(long)]
    duration: String,

    #[arg(long, default_value = "")]
    description: String,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = match args.config {
        Some(dir) => dir,
        None => init_config_dir()?,
    };
    let storage = ConfigStorage::new(config_dir);

    let overrides = ConfigOverrides {
        api_url: args.api_url,
        push_url: args.push_url,
        disable_push: args.no_push,
        log_level: args.log_level,
    };
    let config = overrides.apply(storage.load()?)?;

    setup_logging(&config.log_level);
    tracing::debug!("Using config {}", storage.path().display());

    commands::run(args.command, config, &storage).await
}
