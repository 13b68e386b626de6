use anyhow::{anyhow, Result};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Length of the MIDI payload carried after the command prefix. The first
/// eight bytes are reserved by the envelope and ignored here.
pub const PAYLOAD_LEN: usize = 11;

// Command types carried in the upper nibble of a MIDI status byte.
pub const NOTE_OFF: u8 = 0x8;
pub const NOTE_ON: u8 = 0x9;
pub const AFTERTOUCH: u8 = 0xA;
pub const CONTINUOUS_CONTROLLER: u8 = 0xB;
pub const PATCH_CHANGE: u8 = 0xC;
pub const CHANNEL_PRESSURE: u8 = 0xD;
pub const PITCH_BEND: u8 = 0xE;
pub const SYSTEM: u8 = 0xF;

// Offsets into the 11-byte payload.
const VELOCITY_OFFSET: usize = 8;
const NOTE_OFFSET: usize = 9;
const COMMAND_OFFSET: usize = 10;

/// A decoded MIDI channel-voice message.
///
/// `command` keeps the combined status/channel byte exactly as received, so
/// re-encoding emits the original byte instead of rebuilding it from the
/// split nibbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiNote {
    pub status: u8,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    command: u8,
}

impl MidiNote {
    /// Decodes the fixed-layout payload: offset 10 is the combined
    /// status/channel byte, offset 9 the note, offset 8 the velocity.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != PAYLOAD_LEN {
            return Err(anyhow!(
                "malformed MIDI payload: expected {} bytes, got {}",
                PAYLOAD_LEN,
                payload.len()
            ));
        }
        let command = payload[COMMAND_OFFSET];
        Ok(Self {
            status: command >> 4,
            channel: command & 0x0F,
            note: payload[NOTE_OFFSET],
            velocity: payload[VELOCITY_OFFSET],
            command,
        })
    }

    /// Serializes into the 3-byte wire form: combined status/channel byte,
    /// note, velocity.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3);
        buf.extend_from_slice(&[self.command, self.note, self.velocity]);
        buf.freeze()
    }

    /// Human-readable name of the command type in the status nibble.
    pub fn status_name(&self) -> &'static str {
        match self.status {
            NOTE_OFF => "note off",
            NOTE_ON => "note on",
            AFTERTOUCH => "aftertouch",
            CONTINUOUS_CONTROLLER => "continuous controller",
            PATCH_CHANGE => "patch change",
            CHANNEL_PRESSURE => "channel pressure",
            PITCH_BEND => "pitch bend",
            SYSTEM => "system",
            // upper nibble below 0x8 means the byte was a data byte
            _ => "data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(command: u8, note: u8, velocity: u8) -> [u8; PAYLOAD_LEN] {
        let mut p = [0u8; PAYLOAD_LEN];
        p[VELOCITY_OFFSET] = velocity;
        p[NOTE_OFFSET] = note;
        p[COMMAND_OFFSET] = command;
        p
    }

    #[test]
    fn test_decode_note_on() {
        let note = MidiNote::decode(&payload(0x92, 60, 100)).unwrap();
        assert_eq!(note.status, NOTE_ON);
        assert_eq!(note.channel, 2);
        assert_eq!(note.note, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.status_name(), "note on");
    }

    #[test]
    fn test_wire_encoding_order() {
        let note = MidiNote::decode(&payload(0x92, 60, 100)).unwrap();
        assert_eq!(&note.to_wire()[..], &[0x92, 60, 100]);
    }

    #[test]
    fn test_encode_reemits_original_command_byte() {
        // A status nibble below 0x8 is not a valid command, but the codec
        // must still carry the byte through untouched.
        let note = MidiNote::decode(&payload(0x07, 1, 2)).unwrap();
        assert_eq!(note.status, 0);
        assert_eq!(note.channel, 7);
        assert_eq!(&note.to_wire()[..], &[0x07, 1, 2]);
        assert_eq!(note.status_name(), "data");
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(MidiNote::decode(&[]).is_err());
        assert!(MidiNote::decode(&[0u8; 10]).is_err());
        assert!(MidiNote::decode(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_status_names_cover_command_table() {
        let cases = [
            (0x80, "note off"),
            (0x90, "note on"),
            (0xA0, "aftertouch"),
            (0xB0, "continuous controller"),
            (0xC0, "patch change"),
            (0xD0, "channel pressure"),
            (0xE0, "pitch bend"),
            (0xF0, "system"),
        ];
        for (command, name) in cases {
            let note = MidiNote::decode(&payload(command, 0, 0)).unwrap();
            assert_eq!(note.status_name(), name, "command byte {command:#04x}");
        }
    }
}
