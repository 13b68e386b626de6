use log::{error, info};
use tokio::sync::mpsc;

use midi_bridge::{run_bridge, Config};

/// Main entry point for the bridge daemon.
/// Loads the configuration and serves until interrupted or the instrument fails.
#[tokio::main]
async fn main() {
    // Initialize logging from the RUST_LOG environment variable, defaulting to "info"
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load the application configuration from `config.toml`
    let config = match Config::load_from_file("config.toml") {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config.toml: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded successfully: {:?}", config);

    // Ctrl+C feeds the shutdown channel observed by the service loop.
    let (interrupt_tx, interrupt_rx) = mpsc::channel(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C signal received, initiating shutdown...");
        let _ = interrupt_tx.try_send(());
    })
    .expect("Error setting Ctrl-C handler");

    info!("Bridge starting. Press Ctrl+C to stop.");

    if let Err(e) = run_bridge(config, interrupt_rx).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Bridge has shut down gracefully.");
}
