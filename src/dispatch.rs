use log::warn;

use crate::bridge::MidiBridge;

/// Command prefix for MIDI note packets. The match is an exact byte
/// comparison over the prefix length, nothing more.
pub const MIDI_COMMAND: &[u8] = b"/midi";

/// Routes one control packet to its handler.
///
/// Runs on its own task per packet; packets may be handled in any order.
/// Unrecognized commands are reported and dropped.
pub async fn dispatch(bridge: MidiBridge, packet: Vec<u8>) {
    if packet.starts_with(MIDI_COMMAND) {
        bridge.handle_midi_payload(&packet[MIDI_COMMAND.len()..]).await;
    } else {
        warn!("{} not implemented", String::from_utf8_lossy(&packet));
    }
}
