//! Channel-voice MIDI messages with raw wire encoding.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// 14-bit pitch bend center (no bend).
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Maximum 14-bit pitch bend value.
pub const PITCH_BEND_MAX: u16 = 16383;

/// Controller numbers used by the instrument surface.
pub mod controller {
    /// CC1 - modulation wheel
    pub const MODULATION: u8 = 1;
    /// CC2 - breath controller
    pub const BREATH: u8 = 2;
    /// CC4 - foot controller
    pub const FOOT: u8 = 4;
    /// CC6 - data entry MSB (RPN value)
    pub const DATA_ENTRY: u8 = 6;
    /// CC11 - expression
    pub const EXPRESSION: u8 = 11;
    /// CC91 - reverb send
    pub const REVERB: u8 = 91;
    /// CC100 - RPN LSB
    pub const RPN_LSB: u8 = 100;
    /// CC101 - RPN MSB
    pub const RPN_MSB: u8 = 101;
    /// CC121 - reset all controllers
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    /// CC123 - all notes off
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// A single channel-voice message, addressed to one of the 16 MIDI channels.
///
/// Note Off is always transmitted as status `0x80` with velocity 0, matching
/// the convention of the instrument's historical backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    ChannelAftertouch { channel: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// 14-bit pitch bend, 0..=16383, center 8192.
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::NoteOn {
            channel: channel.min(15),
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::NoteOff {
            channel: channel.min(15),
            note: note & 0x7F,
        }
    }

    #[inline]
    pub fn poly_aftertouch(channel: u8, note: u8, pressure: u8) -> Self {
        Self::PolyAftertouch {
            channel: channel.min(15),
            note: note & 0x7F,
            pressure: pressure & 0x7F,
        }
    }

    #[inline]
    pub fn channel_aftertouch(channel: u8, pressure: u8) -> Self {
        Self::ChannelAftertouch {
            channel: channel.min(15),
            pressure: pressure & 0x7F,
        }
    }

    #[inline]
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::ControlChange {
            channel: channel.min(15),
            controller: controller & 0x7F,
            value: value & 0x7F,
        }
    }

    #[inline]
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::ProgramChange {
            channel: channel.min(15),
            program: program & 0x7F,
        }
    }

    #[inline]
    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        Self::PitchBend {
            channel: channel.min(15),
            value: value.min(PITCH_BEND_MAX),
        }
    }

    /// Pitch bend reset to center.
    #[inline]
    pub fn bend_center(channel: u8) -> Self {
        Self::pitch_bend(channel, PITCH_BEND_CENTER)
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::PolyAftertouch { channel, .. }
            | Self::ChannelAftertouch { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::PitchBend { channel, .. } => channel,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self, Self::NoteOn { .. })
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(self, Self::NoteOff { .. })
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { note, .. }
            | Self::NoteOff { note, .. }
            | Self::PolyAftertouch { note, .. } => Some(note),
            _ => None,
        }
    }

    /// Encode as raw wire bytes (status + data).
    ///
    /// Pitch bend splits its 14-bit value as `value & 0x7F`, `value >> 7`.
    pub fn to_bytes(&self) -> SmallVec<[u8; 3]> {
        match *self {
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => SmallVec::from_slice(&[0x90 | channel, note, velocity]),
            Self::NoteOff { channel, note } => SmallVec::from_slice(&[0x80 | channel, note, 0]),
            Self::PolyAftertouch {
                channel,
                note,
                pressure,
            } => SmallVec::from_slice(&[0xA0 | channel, note, pressure]),
            Self::ChannelAftertouch { channel, pressure } => {
                SmallVec::from_slice(&[0xD0 | channel, pressure])
            }
            Self::ControlChange {
                channel,
                controller,
                value,
            } => SmallVec::from_slice(&[0xB0 | channel, controller, value]),
            Self::ProgramChange { channel, program } => {
                SmallVec::from_slice(&[0xC0 | channel, program])
            }
            Self::PitchBend { channel, value } => SmallVec::from_slice(&[
                0xE0 | channel,
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_bytes() {
        let msg = MidiMessage::note_on(0, 60, 100);
        assert_eq!(msg.to_bytes().as_slice(), &[0x90, 60, 100]);

        let msg = MidiMessage::note_on(15, 60, 100);
        assert_eq!(msg.to_bytes().as_slice(), &[0x9F, 60, 100]);
    }

    #[test]
    fn test_note_off_is_velocity_zero() {
        let msg = MidiMessage::note_off(3, 72);
        assert_eq!(msg.to_bytes().as_slice(), &[0x83, 72, 0]);
    }

    #[test]
    fn test_control_change_bytes() {
        let msg = MidiMessage::control_change(0, controller::MODULATION, 127);
        assert_eq!(msg.to_bytes().as_slice(), &[0xB0, 1, 127]);

        let msg = MidiMessage::control_change(15, controller::REVERB, 64);
        assert_eq!(msg.to_bytes().as_slice(), &[0xBF, 91, 64]);
    }

    #[test]
    fn test_program_change_is_two_bytes() {
        let msg = MidiMessage::program_change(2, 40);
        assert_eq!(msg.to_bytes().as_slice(), &[0xC2, 40]);
    }

    #[test]
    fn test_aftertouch_bytes() {
        let poly = MidiMessage::poly_aftertouch(1, 60, 90);
        assert_eq!(poly.to_bytes().as_slice(), &[0xA1, 60, 90]);

        let chan = MidiMessage::channel_aftertouch(1, 90);
        assert_eq!(chan.to_bytes().as_slice(), &[0xD1, 90]);
    }

    #[test]
    fn test_pitch_bend_14bit_split() {
        // Center
        let msg = MidiMessage::pitch_bend(0, PITCH_BEND_CENTER);
        let bytes = msg.to_bytes();
        assert_eq!(bytes[0], 0xE0);
        assert_eq!((bytes[1] as u16) | ((bytes[2] as u16) << 7), 8192);

        // Max up
        let msg = MidiMessage::pitch_bend(0, PITCH_BEND_MAX);
        let bytes = msg.to_bytes();
        assert_eq!((bytes[1] as u16) | ((bytes[2] as u16) << 7), 16383);

        // Max down
        let msg = MidiMessage::pitch_bend(0, 0);
        let bytes = msg.to_bytes();
        assert_eq!((bytes[1] as u16) | ((bytes[2] as u16) << 7), 0);
    }

    #[test]
    fn test_pitch_bend_clamped_to_14_bits() {
        let msg = MidiMessage::pitch_bend(0, u16::MAX);
        assert_eq!(msg, MidiMessage::pitch_bend(0, PITCH_BEND_MAX));
    }

    #[test]
    fn test_channel_clamped() {
        let msg = MidiMessage::note_on(200, 60, 100);
        assert_eq!(msg.channel(), 15);
    }

    #[test]
    fn test_data_bytes_masked() {
        let msg = MidiMessage::note_on(0, 200, 255);
        assert_eq!(msg.to_bytes().as_slice(), &[0x90, 200 & 0x7F, 255 & 0x7F]);
    }
}
