//! The `MidiSink` facade: one uniform operation set over every backend.

use crate::error::Result;
use crate::message::{controller, MidiMessage, PITCH_BEND_CENTER};

/// Uniform interface over heterogeneous MIDI backends.
///
/// A backend implements `send`; everything else is provided on top of it so
/// all 16 channels behave identically regardless of the transport (hardware
/// port, embedded synthesizer, in-memory collector).
pub trait MidiSink: Send {
    /// Deliver one channel-voice message to the backend.
    fn send(&mut self, msg: MidiMessage) -> Result<()>;

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.send(MidiMessage::note_on(channel, note, velocity))
    }

    fn note_off(&mut self, channel: u8, note: u8) -> Result<()> {
        self.send(MidiMessage::note_off(channel, note))
    }

    fn program_change(&mut self, channel: u8, program: u8) -> Result<()> {
        self.send(MidiMessage::program_change(channel, program))
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) -> Result<()> {
        self.send(MidiMessage::pitch_bend(channel, value))
    }

    /// Reset a channel's pitch bend to center (8192).
    fn bend_center(&mut self, channel: u8) -> Result<()> {
        self.pitch_bend(channel, PITCH_BEND_CENTER)
    }

    fn poly_aftertouch(&mut self, channel: u8, note: u8, pressure: u8) -> Result<()> {
        self.send(MidiMessage::poly_aftertouch(channel, note, pressure))
    }

    fn aftertouch(&mut self, channel: u8, pressure: u8) -> Result<()> {
        self.send(MidiMessage::channel_aftertouch(channel, pressure))
    }

    fn control_change(&mut self, channel: u8, ctl: u8, value: u8) -> Result<()> {
        self.send(MidiMessage::control_change(channel, ctl, value))
    }

    fn modulation(&mut self, channel: u8, value: u8) -> Result<()> {
        self.control_change(channel, controller::MODULATION, value)
    }

    fn breath(&mut self, channel: u8, value: u8) -> Result<()> {
        self.control_change(channel, controller::BREATH, value)
    }

    fn foot(&mut self, channel: u8, value: u8) -> Result<()> {
        self.control_change(channel, controller::FOOT, value)
    }

    fn expression(&mut self, channel: u8, value: u8) -> Result<()> {
        self.control_change(channel, controller::EXPRESSION, value)
    }

    fn reverb(&mut self, channel: u8, value: u8) -> Result<()> {
        self.control_change(channel, controller::REVERB, value)
    }

    /// Set pitch-bend sensitivity in semitones on every channel via the
    /// RPN 0,0 sequence (CC100=0, CC101=0, CC6=semitones).
    fn set_pitch_bend_range(&mut self, semitones: u8) -> Result<()> {
        for channel in 0..16 {
            self.control_change(channel, controller::RPN_LSB, 0)?;
            self.control_change(channel, controller::RPN_MSB, 0)?;
            self.control_change(channel, controller::DATA_ENTRY, semitones)?;
        }
        Ok(())
    }

    /// Silence one channel: all-notes-off, reset controllers, recenter bend.
    fn reset_channel(&mut self, channel: u8) -> Result<()> {
        self.control_change(channel, controller::ALL_NOTES_OFF, 0)?;
        self.control_change(channel, controller::RESET_ALL_CONTROLLERS, 0)?;
        self.bend_center(channel)
    }

    /// Emergency stop: all-notes-off and bend recenter on every channel.
    fn panic(&mut self) -> Result<()> {
        for channel in 0..16 {
            self.control_change(channel, controller::ALL_NOTES_OFF, 0)?;
            self.bend_center(channel)?;
        }
        Ok(())
    }
}

/// In-memory sink recording every message it receives.
///
/// Backs the engine and integration tests; no device required.
#[derive(Debug, Default)]
pub struct CollectorSink {
    sent: Vec<MidiMessage>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[MidiMessage] {
        &self.sent
    }

    pub fn take(&mut self) -> Vec<MidiMessage> {
        std::mem::take(&mut self.sent)
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl MidiSink for CollectorSink {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        self.sent.push(msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_records_in_order() {
        let mut sink = CollectorSink::new();
        sink.note_on(0, 60, 100).unwrap();
        sink.pitch_bend(0, 9000).unwrap();
        sink.note_off(0, 60).unwrap();

        assert_eq!(
            sink.messages(),
            &[
                MidiMessage::note_on(0, 60, 100),
                MidiMessage::pitch_bend(0, 9000),
                MidiMessage::note_off(0, 60),
            ]
        );
    }

    #[test]
    fn test_bend_range_rpn_sequence() {
        let mut sink = CollectorSink::new();
        sink.set_pitch_bend_range(12).unwrap();

        // Three CCs per channel, all 16 channels
        assert_eq!(sink.messages().len(), 48);

        // Channel 0 prefix: RPN select then data entry
        assert_eq!(
            &sink.messages()[..3],
            &[
                MidiMessage::control_change(0, controller::RPN_LSB, 0),
                MidiMessage::control_change(0, controller::RPN_MSB, 0),
                MidiMessage::control_change(0, controller::DATA_ENTRY, 12),
            ]
        );

        // Last channel gets the same sequence
        assert_eq!(
            sink.messages()[45],
            MidiMessage::control_change(15, controller::RPN_LSB, 0)
        );
    }

    #[test]
    fn test_panic_sweeps_all_channels() {
        let mut sink = CollectorSink::new();
        sink.panic().unwrap();

        assert_eq!(sink.messages().len(), 32);
        for channel in 0..16u8 {
            assert_eq!(
                sink.messages()[channel as usize * 2],
                MidiMessage::control_change(channel, controller::ALL_NOTES_OFF, 0)
            );
            assert_eq!(
                sink.messages()[channel as usize * 2 + 1],
                MidiMessage::bend_center(channel)
            );
        }
    }

    #[test]
    fn test_reset_channel() {
        let mut sink = CollectorSink::new();
        sink.reset_channel(5).unwrap();

        assert_eq!(
            sink.messages(),
            &[
                MidiMessage::control_change(5, controller::ALL_NOTES_OFF, 0),
                MidiMessage::control_change(5, controller::RESET_ALL_CONTROLLERS, 0),
                MidiMessage::bend_center(5),
            ]
        );
    }

    #[test]
    fn test_named_cc_helpers() {
        let mut sink = CollectorSink::new();
        sink.modulation(0, 1).unwrap();
        sink.breath(0, 2).unwrap();
        sink.foot(0, 3).unwrap();
        sink.expression(0, 4).unwrap();
        sink.reverb(0, 5).unwrap();

        let controllers: Vec<u8> = sink
            .messages()
            .iter()
            .map(|m| match m {
                MidiMessage::ControlChange { controller, .. } => *controller,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(controllers, vec![1, 2, 4, 11, 91]);
    }
}
