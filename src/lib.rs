//! Stickwork: drum pattern timing, notation and practice
//!
//! This crate gathers the workspace members under one name:
//!
//! - [`timing`]: time signatures, grids, polyrhythms, subdivision detection, kit tables
//! - [`notation`]: voice and sticking tokens, patterns, difficulty, generation
//! - [`midi`]: reading recordings, converting them to patterns, exporting SMF
//! - [`practice`]: expected-note timelines and live hit matching
//!
//! # Examples
//!
//! ```
//! use stickwork::{build_accent_indices, notes_per_bar, TimeSignature};
//!
//! assert_eq!(notes_per_bar(TimeSignature::parse("7/8"), 16).unwrap(), 14);
//! assert_eq!(build_accent_indices(&[3, 3, 2]), vec![0, 3, 6]);
//! ```

pub use stickwork_core as timing;
pub use stickwork_midi as midi;
pub use stickwork_notation as notation;
pub use stickwork_practice as practice;

pub use stickwork_core::{
    detect_subdivisions, ms_per_beat, notes_per_bar, DrumKit, Grid, Limb, Polyrhythm,
    PolyrhythmRatio, SubdivisionDetection, TimeSignature, TimingError, VoiceId, VoiceMapper,
};
pub use stickwork_midi::{convert, export_patterns, ConvertOptions, ConvertedMeasure, MidiRecording};
pub use stickwork_notation::{
    build_accent_indices, build_phrase_from_accents, format, parse_phrase, parse_tokens,
    score_pattern, Difficulty, NoteToken, Pattern, PatternText,
};
pub use stickwork_practice::{
    accuracy, build_expected_notes, match_hit, ExpectedNote, PracticeConfig, PracticeSession,
    SharedSession,
};
