//! Builder wiring a configuration to a MIDI backend.

use polytouch_engine::InstrumentConfig;
use polytouch_midi::MidiSink;

use crate::error::{Error, Result};
use crate::instrument::Instrument;

/// Fluent construction of an [`Instrument`].
///
/// Exactly one backend must be selected: a hardware/virtual port (feature
/// `midi-io`), an embedded SoundFont synthesizer (feature `synth`), or any
/// custom [`MidiSink`].
#[derive(Default)]
pub struct InstrumentBuilder {
    config: Option<InstrumentConfig>,
    sink: Option<Box<dyn MidiSink>>,
    #[cfg(feature = "midi-io")]
    port_name: Option<(String, bool)>,
}

impl InstrumentBuilder {
    pub fn config(mut self, config: InstrumentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use any sink implementation as the backend.
    pub fn sink(mut self, sink: Box<dyn MidiSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Connect to the MIDI output port whose name contains `name`.
    #[cfg(feature = "midi-io")]
    pub fn port_by_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some((name.into(), false));
        self
    }

    /// Like [`port_by_name`](Self::port_by_name), but fall back to the
    /// first available port when no name matches.
    #[cfg(feature = "midi-io")]
    pub fn port_by_name_or_default(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some((name.into(), true));
        self
    }

    /// Use the embedded SoundFont synthesizer as the backend.
    #[cfg(feature = "synth")]
    pub fn soundfont<R: std::io::Read + std::io::Seek>(
        mut self,
        reader: &mut R,
        sample_rate: u32,
    ) -> Result<Self> {
        let sink = polytouch_midi::SynthSink::new(reader, sample_rate)?;
        self.sink = Some(Box::new(sink.into_shared()));
        Ok(self)
    }

    pub fn build(self) -> Result<Instrument> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        #[allow(unused_mut)]
        let mut sink = self.sink;

        #[cfg(feature = "midi-io")]
        if sink.is_none() {
            if let Some((name, fall_back)) = self.port_name {
                let port = polytouch_midi::PortSink::new();
                if fall_back {
                    port.connect_by_name_or_default(&name)?;
                } else {
                    port.connect_by_name(&name)?;
                }
                sink = Some(Box::new(port));
            }
        }

        let mut sink = sink.ok_or(Error::NoBackend)?;

        // Independent-bend mode needs the device's bend sensitivity to
        // match the displacement scaling.
        if config.pitch_bend {
            sink.set_pitch_bend_range(config.bend_range() as u8)?;
        }

        Ok(Instrument::new(config, sink))
    }
}
