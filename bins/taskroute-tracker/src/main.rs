//! TaskRoute tracker CLI
//!
//! Follows the live location feed, prints the in-progress task snapshot and
//! ranks tracked tasks by distance.

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use taskroute_api_client::ApiError;
use taskroute_core::config::{Config, Settings};
use taskroute_core::error::exit_codes;
use taskroute_telemetry::TelemetryConfig;

mod commands;
mod output;

use commands::{nearest, snapshot, watch};

/// Live task tracking for TaskRoute
#[derive(Parser)]
#[command(name = "taskroute-tracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Configuration file
    #[arg(short, long, global = true, env = "TASKROUTE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    /// One JSON document per update
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live feed and print updates until interrupted
    Watch {
        /// Task to compute routes for
        #[arg(short, long)]
        select: Option<i64>,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Print in-progress tasks and their last known positions
    Snapshot,

    /// Rank tracked tasks by distance to a point
    Nearest {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Maximum number of results
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, format);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn report(e: &anyhow::Error, format: Format) {
    if format == Format::Json {
        let details = e.downcast_ref::<taskroute_core::Error>().map(taskroute_core::Error::to_report);
        let body = serde_json::json!({ "error": format!("{e:#}"), "report": details });
        eprintln!("{body}");
    } else {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
    }
}

fn exit_code(e: &anyhow::Error) -> u8 {
    let code = if let Some(err) = e.downcast_ref::<taskroute_core::Error>() {
        match err.code.category() {
            "Configuration" => exit_codes::CONFIG_ERROR,
            "Feed" | "Routing" => exit_codes::UPSTREAM_ERROR,
            _ => exit_codes::FAILURE,
        }
    } else if e.downcast_ref::<ApiError>().is_some() {
        exit_codes::UPSTREAM_ERROR
    } else {
        exit_codes::FAILURE
    };
    u8::try_from(code).unwrap_or(1)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.settings, cli.verbose)?;

    match cli.command {
        Commands::Watch { select, duration } => watch::run(&config.settings, select, duration, cli.format).await,
        Commands::Snapshot => snapshot::run(&config.settings, cli.format).await,
        Commands::Nearest { lat, lng, limit } => {
            nearest::run(&config.settings, lat, lng, limit as usize, cli.format).await
        }
    }
}

fn init_logging(settings: &Settings, verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        "taskroute=debug,taskroute_tracking=debug,taskroute_api_client=debug".to_string()
    } else {
        settings.telemetry.log_level.clone()
    };

    taskroute_telemetry::init_with_config(TelemetryConfig {
        log_level,
        json: settings.telemetry.json,
        show_target: verbose,
    })
}
