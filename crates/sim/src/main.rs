//! AutoDrive Simulator - Main Entry Point

use anyhow::{Context, Result};
use autodrive::AutoDriveConfig;
use autodrive_sim::{init_logging, run, Scenario};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "autodrive-sim")]
#[command(about = "Run scripted AutoDrive scenarios and print what would be spoken", long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum, default_value = "wander")]
    scenario: Scenario,

    /// Run every scenario in turn
    #[arg(long)]
    all: bool,

    /// Scenario length in seconds (each scenario has its own default)
    #[arg(long, value_name = "SECONDS")]
    seconds: Option<u32>,

    /// Configuration file layered over the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print transcripts as JSON
    #[arg(long)]
    json: bool,

    /// Emit log lines as JSON on stderr
    #[arg(long)]
    log_json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json, args.verbose);

    info!("=== AutoDrive sim v{} ===", env!("CARGO_PKG_VERSION"));

    let config = AutoDriveConfig::load(args.config.as_deref())
        .context("Failed to load AutoDrive configuration")?;

    let scenarios = if args.all {
        Scenario::ALL.to_vec()
    } else {
        vec![args.scenario]
    };
    let duration_ms = args.seconds.map(|s| i64::from(s) * 1_000);

    for scenario in scenarios {
        let transcript = run(scenario, config.clone(), duration_ms);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&transcript)?);
        } else {
            println!("{}", transcript.render());
        }
    }

    Ok(())
}
