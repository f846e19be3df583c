//! Pairing played hits with expected notes
//!
//! These functions never mutate the expected list; the session decides what
//! to do with a match.

use serde::{Deserialize, Serialize};

use stickwork_core::VoiceId;

use crate::expected::ExpectedNote;

/// The nearest unmatched expected note for a hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitMatch {
    /// Index into the expected-note list
    pub index: usize,
    /// Hit time minus expected time; negative means early
    pub error_ms: f64,
    /// Whether the error is within tolerance
    pub matched: bool,
}

/// Find the unmatched note of the same voice closest to `hit_time_ms`.
///
/// Returns `None` when no such note exists. On equal distance the note that
/// comes first in the list wins.
pub fn match_hit(
    hit_time_ms: f64,
    voice: VoiceId,
    expected: &[ExpectedNote],
    tolerance_ms: f64,
) -> Option<HitMatch> {
    let mut best: Option<(usize, f64)> = None;

    for (index, note) in expected.iter().enumerate() {
        if note.matched || note.voice != voice {
            continue;
        }
        let error = hit_time_ms - note.time_ms;
        match best {
            Some((_, best_error)) if error.abs() >= best_error.abs() => {}
            _ => best = Some((index, error)),
        }
    }

    best.map(|(index, error_ms)| HitMatch {
        index,
        error_ms,
        matched: error_ms.abs() <= tolerance_ms,
    })
}

/// Fraction of expected notes that have been matched; 0 for an empty list
pub fn accuracy(expected: &[ExpectedNote]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let matched = expected.iter().filter(|n| n.matched).count();
    matched as f64 / expected.len() as f64
}
