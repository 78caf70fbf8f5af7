//! MIDI message decoding
//!
//! Classifies raw controller bytes, renders the human-readable descriptions
//! shown in the signal log and picks out jog-wheel ticks.

pub mod driver;
pub mod jog;
pub mod log;
pub mod rotation;
pub mod session;

use std::fmt;

pub use jog::{jog_event, JogEvent};

/// System real-time and common messages (status 0xF0-0xFF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessage {
    /// Timing Clock (0xF8)
    Clock,
    /// Start (0xFA)
    Start,
    /// Continue (0xFB)
    Continue,
    /// Stop (0xFC)
    Stop,
    /// Active Sensing (0xFE)
    ActiveSensing,
    /// System Reset (0xFF)
    Reset,
    /// Any other 0xF_ status
    Unknown,
}

impl SystemMessage {
    fn from_status(status: u8) -> Self {
        match status {
            0xF8 => SystemMessage::Clock,
            0xFA => SystemMessage::Start,
            0xFB => SystemMessage::Continue,
            0xFC => SystemMessage::Stop,
            0xFE => SystemMessage::ActiveSensing,
            0xFF => SystemMessage::Reset,
            _ => SystemMessage::Unknown,
        }
    }
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemMessage::Clock => "Clock",
            SystemMessage::Start => "Start",
            SystemMessage::Continue => "Continue",
            SystemMessage::Stop => "Stop",
            SystemMessage::ActiveSensing => "Active Sensing",
            SystemMessage::Reset => "Reset",
            SystemMessage::Unknown => "Unknown System",
        };
        f.write_str(name)
    }
}

/// MIDI message types understood by the controller core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note, velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note, velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), controller number, value
    ControlChange { channel: u8, controller: u8, value: u8 },

    /// Pitch Bend: channel (0-15), 14-bit value
    PitchBend { channel: u8, value: u16 },

    /// System message, classified by the full status byte
    System(SystemMessage),

    /// Channel message type this core does not decode (poly pressure, program change, ...)
    Unknown,
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Returns `None` for empty input and for channel messages shorter than
    /// their three-byte layout.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let channel = status & 0x0F;

        let data_bytes = || match rest {
            [first, second, ..] => Some((*first, *second)),
            _ => None,
        };

        match status & 0xF0 {
            0x80 => {
                let (note, velocity) = data_bytes()?;
                Some(MidiMessage::NoteOff { channel, note, velocity })
            }
            0x90 => {
                let (note, velocity) = data_bytes()?;
                Some(MidiMessage::NoteOn { channel, note, velocity })
            }
            0xB0 => {
                let (controller, value) = data_bytes()?;
                Some(MidiMessage::ControlChange { channel, controller, value })
            }
            0xE0 => {
                let (lsb, msb) = data_bytes()?;
                let value = ((msb as u16) << 7) | lsb as u16;
                Some(MidiMessage::PitchBend { channel, value })
            }
            0xF0 => Some(MidiMessage::System(SystemMessage::from_status(status))),
            _ => Some(MidiMessage::Unknown),
        }
    }

    /// Get the channel for channel messages (0-15), None otherwise
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "Note Off: Ch{} Note {} Vel {}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "Note On: Ch{} Note {} Vel {}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                write!(f, "CC: Ch{} CC{} Val {}", channel + 1, controller, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "Pitch Bend: Ch{} Value {}", channel + 1, value)
            }
            MidiMessage::System(system) => write!(f, "System: {}", system),
            MidiMessage::Unknown => f.write_str("Unknown message type"),
        }
    }
}

/// Result of running one raw message through the codec
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub description: String,
    pub message: Option<MidiMessage>,
    pub jog: Option<JogEvent>,
}

/// Decode raw bytes into a description, the parsed message and an optional jog tick
pub fn decode(data: &[u8]) -> Decoded {
    let message = MidiMessage::parse(data);
    Decoded {
        description: describe_parsed(data, message.as_ref()),
        jog: jog_event(data),
        message,
    }
}

/// Human-readable description of raw bytes: `[b0 21 41] CC: Ch1 CC33 Val 65`
pub fn describe(data: &[u8]) -> String {
    describe_parsed(data, MidiMessage::parse(data).as_ref())
}

fn describe_parsed(data: &[u8], message: Option<&MidiMessage>) -> String {
    if data.is_empty() {
        return "Empty message".to_string();
    }

    match message {
        Some(message) => format!("[{}] {}", format_hex(data), message),
        None => format!("[{}] Truncated message", format_hex(data)),
    }
}

/// Format MIDI bytes as space-separated two-digit hex
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x90, 60, 100]).unwrap();

        assert_eq!(msg, MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        });
    }

    #[test]
    fn test_note_on_velocity_zero_stays_note_on() {
        let msg = MidiMessage::parse(&[0x93, 60, 0]).unwrap();

        assert_eq!(msg, MidiMessage::NoteOn {
            channel: 3,
            note: 60,
            velocity: 0,
        });
        assert_eq!(describe(&[0x93, 60, 0]), "[93 3c 00] Note On: Ch4 Note 60 Vel 0");
    }

    #[test]
    fn test_note_off_description() {
        assert_eq!(describe(&[0x80, 0x40, 0x7F]), "[80 40 7f] Note Off: Ch1 Note 64 Vel 127");
    }

    #[test]
    fn test_control_change_description() {
        assert_eq!(describe(&[0xB0, 0x21, 0x41]), "[b0 21 41] CC: Ch1 CC33 Val 65");
        assert_eq!(describe(&[0xBF, 7, 100]), "[bf 07 64] CC: Ch16 CC7 Val 100");
    }

    #[test]
    fn test_pitch_bend() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(msg, MidiMessage::PitchBend { channel: 0, value: 8192 });

        assert_eq!(describe(&[0xE1, 0x7F, 0x7F]), "[e1 7f 7f] Pitch Bend: Ch2 Value 16383");
    }

    #[test]
    fn test_system_messages() {
        assert_eq!(describe(&[0xF8]), "[f8] System: Clock");
        assert_eq!(describe(&[0xFA]), "[fa] System: Start");
        assert_eq!(describe(&[0xFB]), "[fb] System: Continue");
        assert_eq!(describe(&[0xFC]), "[fc] System: Stop");
        assert_eq!(describe(&[0xFE]), "[fe] System: Active Sensing");
        assert_eq!(describe(&[0xFF]), "[ff] System: Reset");
        assert_eq!(describe(&[0xF0, 0x00, 0xF7]), "[f0 00 f7] System: Unknown System");
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(describe(&[0xC0, 5]), "[c0 05] Unknown message type");
        assert_eq!(describe(&[0xA2, 60, 10]), "[a2 3c 0a] Unknown message type");
        assert_eq!(describe(&[0x40, 0x00]), "[40 00] Unknown message type");
    }

    #[test]
    fn test_empty_and_truncated() {
        assert_eq!(describe(&[]), "Empty message");
        assert!(MidiMessage::parse(&[]).is_none());

        assert_eq!(describe(&[0x90, 60]), "[90 3c] Truncated message");
        assert!(MidiMessage::parse(&[0xB0, 0x21]).is_none());
    }

    #[test]
    fn test_decode_carries_jog_event() {
        let decoded = decode(&[0xB1, 0x22, 0x3F]);

        assert_eq!(decoded.description, "[b1 22 3f] CC: Ch2 CC34 Val 63");
        assert_eq!(decoded.jog, Some(JogEvent { channel: 2, delta: -0.2 }));
        assert_eq!(decoded.message.and_then(|m| m.channel()), Some(1));
    }

    #[test]
    fn test_decode_empty() {
        let decoded = decode(&[]);
        assert_eq!(decoded.description, "Empty message");
        assert!(decoded.message.is_none());
        assert!(decoded.jog.is_none());
    }

    proptest! {
        #[test]
        fn note_on_reports_channel_and_data(low in 0u8..16, note in any::<u8>(), velocity in any::<u8>(), tail in proptest::collection::vec(any::<u8>(), 0..3)) {
            let mut data = vec![0x90 | low, note, velocity];
            data.extend(tail);

            let description = describe(&data);
            let expected = format!("Note On: Ch{} Note {} Vel {}", low + 1, note, velocity);
            prop_assert!(description.ends_with(&expected), "{} does not end with {}", description, expected);
            let prefix = format!("[{}]", format_hex(&data));
            prop_assert!(description.starts_with(&prefix));
        }
    }
}
