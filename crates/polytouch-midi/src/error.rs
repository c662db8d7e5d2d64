//! Error types for the MIDI output subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("MIDI device error: {0}")]
    Device(String),

    #[cfg(feature = "synth")]
    #[error("SoundFont error: {0}")]
    SoundFont(String),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Device(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Port(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
