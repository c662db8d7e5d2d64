//! Centralized error type for the polytouch umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("engine: {0}")]
    Engine(#[from] polytouch_engine::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] polytouch_midi::Error),

    #[error("no MIDI backend configured")]
    NoBackend,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
