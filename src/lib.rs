//! # polytouch - Multitouch Grid Instrument
//!
//! Translates finger gestures on a touch surface into MIDI performance
//! messages: note on/off with glide, per-touch continuous pitch bend,
//! aftertouch, and continuous controllers.
//!
//! ## Architecture
//!
//! polytouch is an umbrella crate that coordinates:
//! - **polytouch-engine** - Note grid, channel allocator, touch sessions,
//!   gesture state machine
//! - **polytouch-midi** - Channel-voice messages, the `MidiSink` facade,
//!   hardware-port and embedded-synthesizer backends
//!
//! ## Quick Start
//!
//! ```ignore
//! use polytouch::prelude::*;
//!
//! let instrument = Instrument::builder()
//!     .config(InstrumentConfig {
//!         pitch_bend: true,
//!         ..Default::default()
//!     })
//!     .port_by_name_or_default("ZynAddSubFX")
//!     .build()?;
//!
//! // Per-finger events from the host UI
//! instrument.on_touch_down(1, 420.0, 130.0, None);
//! instrument.on_touch_move(1, 450.0, 130.0, None);
//! instrument.on_touch_up(1, 450.0, 130.0);
//!
//! // Rendering layer drains highlight changes
//! for change in instrument.highlight_events().try_iter() {
//!     // repaint the cell
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware/virtual MIDI port backend (`midi-io`)
//! - `synth` - Embedded SoundFont synthesizer backend
//! - `full` - Everything enabled

mod builder;
mod error;
mod instrument;

pub use builder::InstrumentBuilder;
pub use error::{Error, Result};
pub use instrument::Instrument;

/// Re-export of the translation engine for direct access
pub use polytouch_engine as engine;

pub use polytouch_engine::{
    Action, AftertouchMode, ChannelPool, ExhaustPolicy, GestureTranslator, GridConfig,
    GridLayout, HighlightChange, InstrumentConfig, KeyCell, NoteGrid, Rgba, TouchEvent,
    TouchId, TouchPhase,
};

/// Re-export of the MIDI subsystem for direct access
pub use polytouch_midi as midi;

pub use polytouch_midi::{
    controller, CollectorSink, MidiMessage, MidiSink, PITCH_BEND_CENTER, PITCH_BEND_MAX,
};

#[cfg(feature = "midi-io")]
pub use polytouch_midi::{MidiPortInfo, PortSink};

#[cfg(feature = "synth")]
pub use polytouch_midi::{SharedSynthSink, SynthSink};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Instrument, InstrumentBuilder};

    pub use crate::{
        AftertouchMode, GridConfig, GridLayout, HighlightChange, InstrumentConfig, MidiMessage,
        MidiSink, TouchEvent,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::PortSink;

    #[cfg(feature = "synth")]
    pub use crate::SynthSink;
}
