//! Drum pattern notation, scoring and generation
//!
//! This crate reads and writes the compact text form of a drum pattern
//! (time signature, phrase groups, voice and sticking tokens), checks it for
//! consistency, scores its difficulty and generates new patterns.
//!
//! # Examples
//!
//! ```
//! use stickwork_notation::{score_pattern, PatternText};
//!
//! let pattern = PatternText {
//!     time_signature: "4/4".into(),
//!     subdivision: 8,
//!     phrase: "3 3 2".into(),
//!     voices: "K+S H (S) S H H S H".into(),
//!     sticking: "R L R R L R R L".into(),
//!     ..PatternText::default()
//! }
//! .parse();
//!
//! assert_eq!(pattern.accent_indices().unwrap(), vec![0, 3, 6]);
//! assert!(pattern.validate().is_empty());
//! let difficulty = score_pattern(&pattern).unwrap();
//! assert!(difficulty.score >= 1.0);
//! ```
//!
//! # Token Syntax
//!
//! - Voices: `K` kick, `S` snare, `H` hi-hat, `T` tom, `F` floor, `O` open hi-hat,
//!   `R` ride, `C` crash
//! - Played together: `K+S`
//! - Ghost note: `(S)`
//! - Rest: `-`, `_`, `.`, `~` or `rest`
//! - Sticking: `R`, `L`, `RF`, `LF`; ornament prefix `lR`; ghost `(L)`

pub mod codec;
pub mod difficulty;
pub mod error;
pub mod euclid;
pub mod formatter;
pub mod generator;
pub mod lexer;
pub mod pattern;
pub mod span;
pub mod token;

pub use codec::{
    build_accent_indices, build_phrase_from_accents, join_tokens, parse_numeric_list,
    parse_phrase, parse_tokens,
};
pub use difficulty::{score, score_pattern, Difficulty, DifficultyFeatures, DifficultyTier};
pub use error::{ParseError, Result};
pub use formatter::{format, PatternText};
pub use generator::{AccentStrategy, GeneratorSettings, PatternGenerator};
pub use lexer::{Lexer, Token};
pub use pattern::{Pattern, PatternIssue};
pub use span::Span;
pub use token::{NoteToken, Sticking};
