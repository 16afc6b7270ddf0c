use std::fmt;

use super::error::MidiError;

/// A channel-voice message as requested by a caller.
///
/// Fields are carried as plain integers and are not range-checked here.
/// Range enforcement belongs to the backend that puts bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: i32, velocity: i32, channel: i32 },
    NoteOff { note: i32, velocity: i32, channel: i32 },
    ControlChange { control: i32, value: i32, channel: i32 },
    ProgramChange { program: i32, channel: i32 },
    /// `pitch`: signed 14-bit (-8192 to 8191), 0 is center.
    PitchBend { pitch: i32, channel: i32 },
}

impl MidiMessage {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            MidiMessage::NoteOn { .. } => "note_on",
            MidiMessage::NoteOff { .. } => "note_off",
            MidiMessage::ControlChange { .. } => "control_change",
            MidiMessage::ProgramChange { .. } => "program_change",
            MidiMessage::PitchBend { .. } => "pitch_bend",
        }
    }

    pub fn channel(&self) -> i32 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => channel,
        }
    }

    /// Encode to raw MIDI bytes, rejecting fields outside their wire range.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MidiError> {
        let status = |base: u8| -> Result<u8, MidiError> {
            Ok(base | data_byte("channel", self.channel(), 15)?)
        };

        let bytes = match *self {
            MidiMessage::NoteOn {
                note, velocity, ..
            } => vec![
                status(0x90)?,
                data_byte("note", note, 127)?,
                data_byte("velocity", velocity, 127)?,
            ],
            MidiMessage::NoteOff {
                note, velocity, ..
            } => vec![
                status(0x80)?,
                data_byte("note", note, 127)?,
                data_byte("velocity", velocity, 127)?,
            ],
            MidiMessage::ControlChange { control, value, .. } => vec![
                status(0xB0)?,
                data_byte("control", control, 127)?,
                data_byte("value", value, 127)?,
            ],
            MidiMessage::ProgramChange { program, .. } => {
                vec![status(0xC0)?, data_byte("program", program, 127)?]
            }
            MidiMessage::PitchBend { pitch, .. } => {
                if !(-8192..=8191).contains(&pitch) {
                    return Err(MidiError::InvalidMessage(format!(
                        "pitch must be in range -8192..8191, got {}",
                        pitch
                    )));
                }
                let centered = (pitch + 8192) as u16;
                let lsb = (centered & 0x7F) as u8;
                let msb = ((centered >> 7) & 0x7F) as u8;
                vec![status(0xE0)?, lsb, msb]
            }
        };

        Ok(bytes)
    }
}

fn data_byte(field: &str, value: i32, max: u8) -> Result<u8, MidiError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| {
            MidiError::InvalidMessage(format!(
                "{} must be in range 0..{}, got {}",
                field, max, value
            ))
        })
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::NoteOn {
                note,
                velocity,
                channel,
            } => write!(f, "note_on note={} velocity={} channel={}", note, velocity, channel),
            MidiMessage::NoteOff {
                note,
                velocity,
                channel,
            } => write!(f, "note_off note={} velocity={} channel={}", note, velocity, channel),
            MidiMessage::ControlChange {
                control,
                value,
                channel,
            } => write!(f, "control_change control={} value={} channel={}", control, value, channel),
            MidiMessage::ProgramChange { program, channel } => {
                write!(f, "program_change program={} channel={}", program, channel)
            }
            MidiMessage::PitchBend { pitch, channel } => {
                write!(f, "pitch_bend pitch={} channel={}", pitch, channel)
            }
        }
    }
}

/// Decode an inbound channel-voice message. Anything else yields `None`.
pub fn parse_bytes(data: &[u8]) -> Option<MidiMessage> {
    let (&status, rest) = data.split_first()?;
    let channel = (status & 0x0F) as i32;

    match (status & 0xF0, rest) {
        (0x90, [note, velocity, ..]) if *velocity == 0 => Some(MidiMessage::NoteOff {
            note: *note as i32,
            velocity: 0,
            channel,
        }),
        (0x90, [note, velocity, ..]) => Some(MidiMessage::NoteOn {
            note: *note as i32,
            velocity: *velocity as i32,
            channel,
        }),
        (0x80, [note, velocity, ..]) => Some(MidiMessage::NoteOff {
            note: *note as i32,
            velocity: *velocity as i32,
            channel,
        }),
        (0xB0, [control, value, ..]) => Some(MidiMessage::ControlChange {
            control: *control as i32,
            value: *value as i32,
            channel,
        }),
        (0xC0, [program, ..]) => Some(MidiMessage::ProgramChange {
            program: *program as i32,
            channel,
        }),
        (0xE0, [lsb, msb, ..]) => {
            let raw = ((*msb as i32) << 7) | (*lsb as i32);
            Some(MidiMessage::PitchBend {
                pitch: raw - 8192,
                channel,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_bytes() {
        let msg = MidiMessage::NoteOn {
            note: 60,
            velocity: 100,
            channel: 1,
        };
        assert_eq!(msg.to_bytes().unwrap(), vec![0x91, 60, 100]);
    }

    #[test]
    fn test_pitch_bend_extremes() {
        let low = MidiMessage::PitchBend {
            pitch: -8192,
            channel: 0,
        };
        let center = MidiMessage::PitchBend {
            pitch: 0,
            channel: 0,
        };
        let high = MidiMessage::PitchBend {
            pitch: 8191,
            channel: 0,
        };
        assert_eq!(low.to_bytes().unwrap(), vec![0xE0, 0x00, 0x00]);
        assert_eq!(center.to_bytes().unwrap(), vec![0xE0, 0x00, 0x40]);
        assert_eq!(high.to_bytes().unwrap(), vec![0xE0, 0x7F, 0x7F]);
    }

    #[test]
    fn test_out_of_range_rejected_at_encode() {
        let bad_note = MidiMessage::NoteOn {
            note: 128,
            velocity: 64,
            channel: 0,
        };
        let bad_channel = MidiMessage::ProgramChange {
            program: 0,
            channel: 16,
        };
        let bad_pitch = MidiMessage::PitchBend {
            pitch: 8192,
            channel: 0,
        };
        let negative = MidiMessage::ControlChange {
            control: -1,
            value: 0,
            channel: 0,
        };
        for msg in [bad_note, bad_channel, bad_pitch, negative] {
            assert!(matches!(msg.to_bytes(), Err(MidiError::InvalidMessage(_))));
        }
    }

    #[test]
    fn test_parse_velocity_zero_is_note_off() {
        let msg = parse_bytes(&[0x92, 64, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                note: 64,
                velocity: 0,
                channel: 2
            }
        );
    }

    #[test]
    fn test_parse_pitch_bend_center() {
        let msg = parse_bytes(&[0xE3, 0x00, 0x40]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::PitchBend {
                pitch: 0,
                channel: 3
            }
        );
    }

    #[test]
    fn test_parse_ignores_system_and_short_messages() {
        assert_eq!(parse_bytes(&[]), None);
        assert_eq!(parse_bytes(&[0xF8]), None);
        assert_eq!(parse_bytes(&[0x90, 60]), None);
    }
}
