//! AutoDrive Simulation Harness
//!
//! Drives the orchestrator against the in-memory host with a tiny
//! kinematic model, so scenarios can be run and listened to from a
//! terminal.

pub mod scenario;
pub mod world;

pub use scenario::{run, Scenario, SpokenLine, Transcript};
pub use world::SimWorld;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global subscriber; logs go to stderr so stdout stays clean
/// for transcripts
pub fn init_logging(json: bool, verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
