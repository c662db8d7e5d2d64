//! Touch-to-MIDI translation engine for the polytouch instrument.
//!
//! The pipeline, leaf to root: a [`NoteGrid`] resolves touch positions to
//! notes, a [`ChannelPool`] hands out per-touch MIDI channels so each
//! finger can bend pitch independently, and the [`GestureTranslator`]
//! state machine turns touch-down/move/up into ordered MIDI messages and
//! highlight changes.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{
    AftertouchMode, ExhaustPolicy, GridConfig, GridLayout, InstrumentConfig, Rgba,
};

pub mod grid;
pub use grid::{KeyBounds, KeyCell, NoteGrid};

pub mod channels;
pub use channels::{ChannelPool, TouchId};

pub mod session;
pub use session::{ChannelAssignment, SessionTable, TouchSession};

pub mod translator;
pub use translator::{
    Action, Actions, GestureTranslator, HighlightChange, TouchEvent, TouchPhase,
};
