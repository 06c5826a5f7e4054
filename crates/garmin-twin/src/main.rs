use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use garmin_twin::cli::commands;
use garmin_twin::config::AppConfig;
use garmin_twin::models::BiometricMeasures;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "garmin-twin")]
#[command(author, version, about = "Garmin digital twin: ETL, coaching and push notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./twin.toml if present)
    #[arg(long, global = true, env = "TWIN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch today's sleep, body battery and activities into the staging area
    Extract,
    /// Turn today's staged data into KPI records
    Transform,
    /// Write today's KPI records to the spreadsheet
    Load,
    /// Morning readiness message, pushed to Telegram
    Coach,
    /// Post-workout debrief of the latest activity, pushed to Telegram
    Debrief,
    /// Run extract, transform, load and coach in sequence
    Run,
    /// Record today's smart-scale measurements
    WeighIn {
        #[command(flatten)]
        measures: BiometricMeasures,
    },
    /// Show the latest telemetry, activity and balance indicators
    Snapshot,
}

impl Cli {
    /// Flags each stage process inherits from `run`
    fn forwarded_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if self.verbose > 0 {
            args.push(OsString::from(format!("-{}", "v".repeat(self.verbose as usize))));
        }
        if let Some(path) = &self.config {
            args.push(OsString::from("--config"));
            args.push(path.clone().into_os_string());
        }
        args
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "garmin_twin=info,warn",
        1 => "garmin_twin=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let forwarded = cli.forwarded_args();
    let result = match AppConfig::load(cli.config.as_deref()) {
        Err(e) => Err(e),
        Ok(config) => match cli.command {
            Commands::Extract => commands::extract(&config).await.map(|_| 0),
            Commands::Transform => commands::transform(&config).map(|_| 0),
            Commands::Load => commands::load(&config).await.map(|_| 0),
            Commands::Coach => commands::coach(&config).await.map(|_| 0),
            Commands::Debrief => commands::debrief(&config).await.map(|_| 0),
            Commands::Run => commands::run(&config, forwarded).await,
            Commands::WeighIn { measures } => commands::weigh_in(&config, measures).await.map(|_| 0),
            Commands::Snapshot => commands::snapshot(&config).await.map(|_| 0),
        },
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", garmin_twin::error::format_user_error(&e));
            std::process::exit(e.exit_code());
        }
    }
}
