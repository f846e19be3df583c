//! Standard MIDI File import and export for drum patterns
//!
//! - [`MidiRecording`]: note-ons and tempo read from a `.mid` file
//! - [`convert`]: quantize a recording into per-measure pattern notation
//! - [`export_patterns`]: write patterns as a format 0 file on the drum channel

pub mod convert;
pub mod error;
pub mod export;
pub mod midi;

pub use convert::{convert, convert_recording, ConvertOptions, ConvertedMeasure};
pub use error::{MidiError, Result};
pub use export::{export_patterns, write_smf};
pub use midi::{MidiRecordedNote, MidiRecording};
