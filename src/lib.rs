use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use log::info;
use serde::Deserialize;
use tokio::sync::mpsc;

pub mod bridge;
pub mod device;
pub mod dispatch;
pub mod listener;
pub mod midi;

use bridge::{BridgeFault, MidiBridge};
use device::SerialStream;
use listener::NetworkListener;

/// Default UDP control port.
pub const DEFAULT_PORT: u16 = 12101;

/// Application configuration loaded from config.toml
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// MIDI input device path (e.g. /dev/snd/midiC1D0)
    pub midi_in: Option<String>,
    /// MIDI output device path
    pub midi_out: Option<String>,
    /// Single device used for both input and output; wins over the
    /// direction-specific paths
    pub midi: Option<String>,
    /// UDP control port (default: 12101)
    pub listen_port: Option<u16>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn midi_in_path(&self) -> Result<&str> {
        self.midi
            .as_deref()
            .or(self.midi_in.as_deref())
            .ok_or_else(|| anyhow!("no MIDI input device configured (set `midi` or `midi_in`)"))
    }

    pub fn midi_out_path(&self) -> Result<&str> {
        self.midi
            .as_deref()
            .or(self.midi_out.as_deref())
            .ok_or_else(|| anyhow!("no MIDI output device configured (set `midi` or `midi_out`)"))
    }
}

/// Wires the devices, the bridge, and the UDP listener together and serves
/// until interrupted or until the instrument connection fails.
///
/// The instrument is critical: a device that fails to open, or an input
/// device that becomes unreadable, ends the service with an error. The
/// network is not: receive errors are absorbed by the listener loop.
pub async fn run_bridge(config: Config, mut interrupt_rx: mpsc::Receiver<()>) -> Result<()> {
    let in_path = config.midi_in_path()?;
    let input = SerialStream::open_input(in_path)
        .await
        .map_err(|e| anyhow!("opening MIDI input device {}: {}", in_path, e))?;

    let out_path = config.midi_out_path()?;
    let output = SerialStream::open_output(out_path)
        .await
        .map_err(|e| anyhow!("opening MIDI output device {}: {}", out_path, e))?;

    let bridge = MidiBridge::new(Box::new(output));

    let (fault_tx, mut fault_rx) = mpsc::channel(1);
    tokio::spawn(MidiBridge::listen_input(Box::new(input), fault_tx));

    let listener = NetworkListener::bind(config.listen_port.unwrap_or(DEFAULT_PORT)).await?;

    tokio::select! {
        _ = listener.run(bridge) => Ok(()),
        fault = fault_rx.recv() => match fault {
            Some(BridgeFault::InputDevice(e)) => Err(anyhow!("MIDI input device failed: {}", e)),
            None => Err(anyhow!("input listener stopped without reporting a fault")),
        },
        _ = interrupt_rx.recv() => {
            info!("Interrupt received, shutting down.");
            Ok(())
        }
    }
}
