//! MIDI output subsystem for the polytouch instrument.
//!
//! Provides channel-voice message types with raw wire encoding, the
//! [`MidiSink`] facade, and the concrete backends behind it.
//!
//! Feature gates: `midi-io` (hardware/virtual ports via midir), `synth`
//! (embedded SoundFont synthesizer via rustysynth).

pub mod error;
pub use error::{Error, Result};

pub mod message;
pub use message::{controller, MidiMessage, PITCH_BEND_CENTER, PITCH_BEND_MAX};

pub mod sink;
pub use sink::{CollectorSink, MidiSink};

#[cfg(feature = "midi-io")]
pub mod port;
#[cfg(feature = "midi-io")]
pub use port::{MidiPortInfo, PortSink};

#[cfg(feature = "synth")]
pub mod synth;
#[cfg(feature = "synth")]
pub use synth::{SharedSynthSink, SynthSink};
