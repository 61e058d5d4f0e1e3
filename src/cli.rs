use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use crate::{
    config::Config,
    snapshot,
    store::{Reading, SnapshotStore},
};

/// The command line interface for the telemetry bridge.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a configuration file
    pub config: Option<PathBuf>,

    /// Listen on this port instead of the configured one
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use this device instead of scanning for one
    #[arg(short, long)]
    pub device: Option<String>,

    /// Log level for stdout
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Also log (at debug level) to daily rolling files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Examples for user convenience.
    #[clap(subcommand)]
    Examples(Examples),
}

/// Helpful examples for users.
#[derive(Subcommand, Clone, Debug)]
pub enum Examples {
    /// Show an example of a configuration file's contents.
    Config,

    /// Show an example JSON body served at `/api/sensors`.
    Response,
}

/// An example of what the read endpoint serves.
pub fn example_response() -> Reading {
    let store = SnapshotStore::new();

    let line = json!({
        "temperature": 21.5,
        "humidity": 40.2,
        "pressure": 1013.25,
        "iaq": 42.0,
        "pm2_5": 7,
        "aqi_level": "Good",
    })
    .to_string();

    if let Some(snapshot) = snapshot::parse(&line) {
        store.publish(snapshot);
    }
    store.set_connected(true);

    store.read()
}

/// Handle the given command.
pub fn handle_command(command: Commands) -> Result<(), crate::error::Error> {
    match command {
        Commands::Examples(example) => match example {
            Examples::Config => {
                println!("{}", Config::example().serialize_pretty()?);
            }
            Examples::Response => {
                let body = example_response().to_json();
                println!("{body:#}");
            }
        },
    }

    Ok(())
}
