use serde::{Deserialize, Serialize};

use stickwork_core::{ms_per_beat, DrumKit, Result, VoiceId};
use stickwork_notation::Pattern;

/// A note the player is expected to strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedNote {
    /// Offset from the start of the session
    pub time_ms: f64,
    pub voice: VoiceId,
    /// MIDI note from the kit
    pub note: u8,
    /// Position in the expected-note list
    pub index: usize,
    pub matched: bool,
}

impl ExpectedNote {
    /// Matching is one way; a matched note stays matched
    pub fn mark_matched(&mut self) {
        self.matched = true;
    }
}

/// Lay patterns out back to back on one timeline.
///
/// Each pattern plays `repeat` times. A note lasts its grid step, so per-beat
/// subdivisions change the spacing within each beat. Combined tokens produce
/// one expected note per voice at the same time. Rests and voices the kit has
/// no note for produce nothing but still take up their step.
pub fn build_expected_notes(
    patterns: &[Pattern],
    bpm: f64,
    kit: &DrumKit,
) -> Result<Vec<ExpectedNote>> {
    let beat_ms = ms_per_beat(bpm)?;
    let mut expected = Vec::new();
    let mut time_ms = 0.0;

    for pattern in patterns {
        let notes = pattern.notes()?;
        let steps = pattern.grid()?.step_beats();

        for _ in 0..pattern.repeat {
            for (token, step) in notes.iter().zip(&steps) {
                for &voice in &token.voices {
                    match kit.note_for(voice) {
                        Some(note) => expected.push(ExpectedNote {
                            time_ms,
                            voice,
                            note,
                            index: expected.len(),
                            matched: false,
                        }),
                        None => {
                            log::warn!("kit has no note for {}, not expecting it", voice.name())
                        }
                    }
                }
                time_ms += beat_ms * step;
            }
        }
    }

    Ok(expected)
}

/// Total length of the patterns played back to back
pub fn timeline_length_ms(patterns: &[Pattern], bpm: f64) -> Result<f64> {
    let beat_ms = ms_per_beat(bpm)?;
    let mut total = 0.0;
    for pattern in patterns {
        let bar_beats: f64 = pattern.grid()?.step_beats().iter().sum();
        total += bar_beats * beat_ms * pattern.repeat as f64;
    }
    Ok(total)
}
