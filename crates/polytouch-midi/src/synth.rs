//! Embedded SoundFont synthesizer backend.
//!
//! Routes the same channel-voice messages as the port backend into a
//! `rustysynth` synthesizer, so the instrument sounds identical whether it
//! drives an external device or renders audio itself.

use std::io::{Read, Seek};
use std::sync::Arc;

use parking_lot::Mutex;
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};

use crate::error::{Error, Result};
use crate::message::MidiMessage;
use crate::sink::MidiSink;

/// Embedded synthesizer sink.
pub struct SynthSink {
    synthesizer: Synthesizer,
    sample_rate: u32,
}

impl SynthSink {
    /// Load a SoundFont and create the synthesizer at the given sample rate.
    pub fn new<R: Read + Seek>(soundfont: &mut R, sample_rate: u32) -> Result<Self> {
        let soundfont =
            Arc::new(SoundFont::new(soundfont).map_err(|e| Error::SoundFont(e.to_string()))?);
        let settings = SynthesizerSettings::new(sample_rate as i32);
        let synthesizer =
            Synthesizer::new(&soundfont, &settings).map_err(|e| Error::SoundFont(e.to_string()))?;
        Ok(Self {
            synthesizer,
            sample_rate,
        })
    }

    /// Render stereo audio (buffers must have the same length).
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.synthesizer.render(left, right);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Wrap in a cloneable handle so the host audio callback can render
    /// while the UI thread keeps sending messages.
    pub fn into_shared(self) -> SharedSynthSink {
        SharedSynthSink {
            inner: Arc::new(Mutex::new(self)),
        }
    }
}

impl MidiSink for SynthSink {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        let (channel, command, data1, data2) = match msg {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => (channel, 0x90, note, velocity),
            MidiMessage::NoteOff { channel, note } => (channel, 0x80, note, 0),
            MidiMessage::PolyAftertouch {
                channel,
                note,
                pressure,
            } => (channel, 0xA0, note, pressure),
            MidiMessage::ChannelAftertouch { channel, pressure } => (channel, 0xD0, pressure, 0),
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => (channel, 0xB0, controller, value),
            MidiMessage::ProgramChange { channel, program } => (channel, 0xC0, program, 0),
            MidiMessage::PitchBend { channel, value } => (
                channel,
                0xE0,
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ),
        };
        self.synthesizer.process_midi_message(
            channel as i32,
            command,
            data1 as i32,
            data2 as i32,
        );
        Ok(())
    }
}

/// Cloneable handle over a shared [`SynthSink`].
#[derive(Clone)]
pub struct SharedSynthSink {
    inner: Arc<Mutex<SynthSink>>,
}

impl SharedSynthSink {
    /// Render stereo audio from the host audio callback.
    pub fn render(&self, left: &mut [f32], right: &mut [f32]) {
        self.inner.lock().render(left, right);
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().sample_rate()
    }
}

impl MidiSink for SharedSynthSink {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        self.inner.lock().send(msg)
    }
}
