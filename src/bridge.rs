use std::sync::Arc;

use log::{error, info};
use tokio::sync::{mpsc, Mutex};

use crate::device::{DeviceReceiver, DeviceSender, StreamError};
use crate::midi::codec::MidiNote;

/// Read size for one chunk from the MIDI input device.
const READ_BUF_LEN: usize = 1024;

/// Faults that must take the whole service down. The input loop reports them
/// on a channel; the coordinator decides to exit.
#[derive(Debug)]
pub enum BridgeFault {
    /// The MIDI input device became unreadable.
    InputDevice(StreamError),
}

/// Owns the output half of the MIDI instrument and serializes writes to it.
///
/// Cheap to clone; every dispatch task holds its own handle to the shared
/// output device.
#[derive(Clone)]
pub struct MidiBridge {
    out: Arc<Mutex<Box<dyn DeviceSender>>>,
}

impl MidiBridge {
    pub fn new(out: Box<dyn DeviceSender>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Handles the payload of a recognized `/midi` command: decode, trace,
    /// re-encode, write.
    ///
    /// The envelope is fixed-length; payloads of any other length are
    /// dropped without a trace.
    pub async fn handle_midi_payload(&self, payload: &[u8]) {
        let note = match MidiNote::decode(payload) {
            Ok(note) => note,
            Err(_) => return,
        };

        info!("MidiNote: {:?} ({})", note, note.status_name());

        self.write(&note.to_wire()).await;
    }

    /// Writes raw bytes to the output device. The lock is held for the
    /// duration of the physical write only, so concurrent writes never
    /// interleave but their relative order is unspecified.
    pub async fn write(&self, payload: &[u8]) {
        let mut out = self.out.lock().await;
        if let Err(e) = out.send(payload).await {
            error!("MIDI out write failed: {}", e);
        }
    }

    /// Runs the input-device listen loop for the lifetime of the process.
    ///
    /// Each chunk read from the instrument is copied out of the reused read
    /// buffer and traced as concatenated 8-bit binary strings. A read
    /// failure (or the device closing) is fatal: it is reported on
    /// `fault_tx` and the loop ends.
    pub async fn listen_input(
        mut input: Box<dyn DeviceReceiver>,
        fault_tx: mpsc::Sender<BridgeFault>,
    ) {
        let mut buf = [0u8; READ_BUF_LEN];
        loop {
            match input.read(&mut buf).await {
                Ok(0) => {
                    let fault = StreamError::Device("input device closed".to_string());
                    error!("MIDI in read failed: {}", fault);
                    let _ = fault_tx.send(BridgeFault::InputDevice(fault)).await;
                    return;
                }
                Ok(n) => {
                    let chunk = buf[..n].to_vec();
                    info!("Midi device in: {}", format_device_bytes(&chunk));
                }
                Err(e) => {
                    error!("MIDI in read failed: {}", e);
                    let _ = fault_tx.send(BridgeFault::InputDevice(e)).await;
                    return;
                }
            }
        }
    }
}

/// Renders device bytes as concatenated 8-bit binary strings, one string of
/// digits per chunk.
pub fn format_device_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:08b}")).collect()
}
