use anyhow::{Context, Result};
use grbljog::{
    controller::{config::ControllerConfig, connect_and_run},
    input::bridge::BridgeInput,
    transport::OfflineFirmware,
};
use serial2_tokio::SerialPort;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut config_path = None;
    let mut verbose = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => config_path = Some(arg),
        }
    }

    // stdout carries haptic feedback for the input bridge, logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    info!("Starting grbljog");

    let config = match &config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            ControllerConfig::load(path)?
        }
        None => ControllerConfig::default(),
    };

    let input = BridgeInput::spawn(std::io::stdin(), std::io::stdout(), config.dead_zone)
        .context("Failed to start the input bridge")?;

    // Errors are reported once, by the `Result` returned from main.
    match &config.port {
        Some(port) => {
            info!("Opening {} @ {} baud", port, config.baud_rate);
            let serial = SerialPort::open(port, config.baud_rate)
                .with_context(|| format!("Failed to open serial port {}", port))?;
            connect_and_run(serial, Box::new(input), &config, interrupted()).await?;
        }
        None => {
            warn!("No serial port configured, using offline firmware");
            connect_and_run(OfflineFirmware::new(), Box::new(input), &config, interrupted())
                .await?;
        }
    }

    info!("Stopped by operator");
    Ok(())
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for the interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
}
