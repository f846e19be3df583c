use stickwork_core::TimingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MidiError>;

#[derive(Error, Debug)]
pub enum MidiError {
    #[error("Failed to read MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse MIDI file: {0}")]
    Parse(#[from] midly::Error),

    #[error("Failed to write MIDI: {0}")]
    Write(String),

    #[error(transparent)]
    Timing(#[from] TimingError),
}
