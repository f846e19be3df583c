//! Core timing types and calculators for drum patterns
//!
//! This crate converts between musical time (meters, subdivisions, beats) and
//! the numbers the rest of the workspace works with. Everything here is a pure
//! function over immutable input.
//!
//! # Examples
//!
//! ```
//! use stickwork_core::{Grid, TimeSignature};
//!
//! let ts = TimeSignature::parse("7/8");
//! let grid = Grid::uniform(ts, 16).unwrap();
//! assert_eq!(grid.notes_per_bar(), 14);
//! ```
//!
//! # Main Components
//!
//! - **TimeSignature / Grid**: notes per bar and note positions
//! - **Polyrhythm**: positions, alignments, cycle length and tuplets for N:M
//! - **Subdivision detection**: per-beat subdivision from recorded onsets
//! - **Kit**: voice ids, limbs, and General MIDI drum tables
//! - **Fraction**: exact rational arithmetic for beat math

pub mod error;
pub mod fraction;
pub mod kit;
pub mod polyrhythm;
pub mod subdivision;
pub mod time_signature;

pub use error::{ms_per_beat, Result, TimingError};
pub use fraction::{gcd, lcm, Fraction};
pub use kit::{DrumKit, Limb, MappingSource, VoiceId, VoiceMapper};
pub use polyrhythm::{
    Alignment, Polyrhythm, PolyrhythmDurations, PolyrhythmRatio, PolyrhythmVoice, TupletConfig,
    VoiceDuration,
};
pub use subdivision::{detect_subdivisions, SubdivisionDetection};
pub use time_signature::{notes_per_bar, Grid, TimeSignature};
