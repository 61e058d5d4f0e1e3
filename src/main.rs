use clap::Parser;
use color_eyre::Result;
use telemetry_bridge::{
    cli,
    config::{Config, DeviceConfig},
    error::Error,
    locator::DevicePath,
    logging,
    reader::Reader,
    server,
    store::SnapshotStore,
};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        cli::handle_command(command)?;

        return Ok(());
    }

    logging::init(cli.log_level, cli.log_dir.map(|dir| (Level::DEBUG, dir))).await;

    let mut config = if let Some(config_path) = cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)?
    } else {
        debug!("Default config");
        Config::default()
    };

    if let Some(port) = cli.port {
        config.listen.set_port(port);
    }

    if let Some(device) = cli.device {
        config.device = DeviceConfig::Fixed(DevicePath::new(device));
    }

    config.validate()?;
    debug!(?config, "Using config");

    let store = SnapshotStore::new();

    let reader = Reader::new(
        config.device.locator(),
        config.connector(),
        store.clone(),
        config.reader_settings(),
    )
    .spawn();

    info!(device = ?config.device, baud = config.baud, "Looking for device");

    #[cfg(unix)]
    let hangup = async {
        match signal(SignalKind::hangup()) {
            Ok(mut hangup) => {
                hangup.recv().await;
            }
            Err(e) => {
                error!(%e, "Could not listen for hangups");
                futures::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let hangup = futures::future::pending::<()>();

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
            Ok(())
        }
        _ = hangup => {
            info!("Told to hang up, quitting");
            Ok(())
        }
        served = server::run_on(store, config.listen) => {
            error!("Server returned");
            served.and(Err(Error::Server("Server stopped unexpectedly".into())))
        }
    };

    // Release the serial port before exiting.
    reader.shutdown().await;

    Ok(outcome?)
}
