//! Live practice against drum patterns
//!
//! A session lays one or more patterns out on a timeline of expected notes,
//! then scores each incoming hit against the nearest unmatched note of the
//! same voice.
//!
//! # Examples
//!
//! ```
//! use stickwork_core::VoiceId;
//! use stickwork_notation::PatternText;
//! use stickwork_practice::{HitClassification, PracticeConfig, PracticeSession};
//!
//! let pattern = PatternText {
//!     subdivision: 8,
//!     voices: "K H S H".into(),
//!     ..PatternText::default()
//! }
//! .parse();
//!
//! let mut session = PracticeSession::start(&[pattern], PracticeConfig::default()).unwrap();
//! let hit = session.register_hit(510.0, VoiceId::Snare);
//! assert_eq!(hit.classification, HitClassification::Perfect);
//! assert_eq!(hit.error_ms, Some(10.0));
//! ```

pub mod config;
pub mod error;
pub mod expected;
pub mod matching;
pub mod session;
pub mod shared;

pub use config::PracticeConfig;
pub use error::{PracticeError, Result};
pub use expected::{build_expected_notes, timeline_length_ms, ExpectedNote};
pub use matching::{accuracy, match_hit, HitMatch};
pub use session::{HitClassification, PracticeHit, PracticeSession, SessionSummary};
pub use shared::SharedSession;
