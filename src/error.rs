//! Error types for the collaborators around the control engine
//!
//! The engine itself never fails: these errors only surface from the
//! player, GPIO and MIDI port implementations, and the engine absorbs them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("MIDI device error: {0}")]
    Device(String),

    #[error("GPIO error: {0}")]
    Gpio(String),
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Device(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Port(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Port(e.to_string())
    }
}

impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Port(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
