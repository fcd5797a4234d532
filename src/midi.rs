//! MIDI utilities and message types
//!
//! Raw 3-byte wire messages from the control surface, a parsed view of the
//! messages the gateway emits or intercepts, and port lookup helpers.

use midir::MidiIO;
use std::fmt;

/// Controller number carrying channel volume
pub const CC_VOLUME: u8 = 7;

/// Controller number carrying channel balance
pub const CC_BALANCE: u8 = 8;

/// Value sent to light a surface LED
pub const LED_ON_VALUE: u8 = 0x7F;

/// Value sent to turn a surface LED off
pub const LED_OFF_VALUE: u8 = 0x00;

/// A raw 3-byte message as received from the control surface.
///
/// `data2` is payload only (position, press/release); it never takes part
/// in identifying which physical control sent the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl WireMessage {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self { status, data1, data2 }
    }

    /// Take the first three bytes of a raw buffer; shorter buffers are rejected
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match data {
            [status, data1, data2, ..] => Some(Self::new(*status, *data1, *data2)),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_hex(&self.to_bytes()))
    }
}

/// Messages the gateway sends to the player or picks out of the song stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Song Position Pointer, in MIDI beats (sixteenth notes)
    SongPosition { position: u16 },

    /// Start
    Start,

    /// Continue
    Continue,

    /// Stop
    Stop,
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes; other messages yield `None`
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        match status {
            0xB0..=0xBF => {
                let [_, cc, value] = three(data)?;
                Some(MidiMessage::ControlChange {
                    channel: status & 0x0F,
                    cc,
                    value,
                })
            }
            0xF2 => {
                let [_, lsb, msb] = three(data)?;
                Some(MidiMessage::SongPosition {
                    position: ((msb as u16) << 7) | lsb as u16,
                })
            }
            0xFA => Some(MidiMessage::Start),
            0xFB => Some(MidiMessage::Continue),
            0xFC => Some(MidiMessage::Stop),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::SongPosition { position } => {
                vec![0xF2, (position & 0x7F) as u8, ((position >> 7) & 0x7F) as u8]
            }
            MidiMessage::Start => vec![0xFA],
            MidiMessage::Continue => vec![0xFB],
            MidiMessage::Stop => vec![0xFC],
        }
    }
}

fn three(data: &[u8]) -> Option<[u8; 3]> {
    match data {
        [status, d1, d2, ..] => Some([*status, d1 & 0x7F, d2 & 0x7F]),
        _ => None,
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find a port whose name contains `pattern` (case-insensitive)
pub fn find_port_by_substring<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        name.to_lowercase().contains(&pattern).then_some((port, name))
    })
}

/// List the names of every port exposed by a MIDI input or output
pub fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_from_bytes() {
        assert_eq!(
            WireMessage::from_bytes(&[0xB0, 0x29, 0x7F]),
            Some(WireMessage::new(0xB0, 0x29, 0x7F))
        );
        assert_eq!(WireMessage::from_bytes(&[0xB0, 0x29]), None);
    }

    #[test]
    fn test_notes_are_not_parsed() {
        // Forwarded raw to the synth
        assert_eq!(MidiMessage::parse(&[0x90, 60, 100]), None);
        assert_eq!(MidiMessage::parse(&[0xC0, 5]), None);
    }

    #[test]
    fn test_control_change() {
        let msg = MidiMessage::parse(&[0xB2, 7, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::ControlChange {
                channel: 2,
                cc: 7,
                value: 100,
            }
        );
        assert_eq!(msg.encode(), vec![0xB2, 7, 100]);
    }

    #[test]
    fn test_song_position() {
        let msg = MidiMessage::SongPosition { position: 300 };
        let bytes = msg.encode();
        // 300 = 2 * 128 + 44
        assert_eq!(bytes, vec![0xF2, 44, 2]);
        assert_eq!(MidiMessage::parse(&bytes), Some(msg));
    }

    #[test]
    fn test_running_status_is_rejected() {
        assert_eq!(MidiMessage::parse(&[0x40, 0x10]), None);
        assert_eq!(MidiMessage::parse(&[0xB0, 7]), None);
        assert_eq!(MidiMessage::parse(&[]), None);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xB0, 0x2E, 0x7F]), "B0 2E 7F");
    }
}
