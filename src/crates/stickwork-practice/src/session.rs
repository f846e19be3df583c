use serde::{Deserialize, Serialize};
use std::fmt;

use stickwork_core::{VoiceId, VoiceMapper};
use stickwork_notation::Pattern;

use crate::config::PracticeConfig;
use crate::error::Result;
use crate::expected::{build_expected_notes, timeline_length_ms, ExpectedNote};
use crate::matching::{self, match_hit};

/// How a hit lined up with the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitClassification {
    /// Within the perfect window
    Perfect,
    Early,
    Late,
    /// Nothing to match within tolerance
    Extra,
}

impl fmt::Display for HitClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HitClassification::Perfect => "perfect",
            HitClassification::Early => "early",
            HitClassification::Late => "late",
            HitClassification::Extra => "extra",
        };
        f.write_str(label)
    }
}

/// One hit as the player saw it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeHit {
    /// Hit time after latency compensation
    pub time_ms: f64,
    pub voice: VoiceId,
    /// Nearest unmatched note of the same voice, even when out of tolerance
    pub expected_index: Option<usize>,
    pub expected_time_ms: Option<f64>,
    pub error_ms: Option<f64>,
    pub classification: HitClassification,
}

/// Totals for a session so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub expected: usize,
    pub matched: usize,
    pub perfect: usize,
    pub early: usize,
    pub late: usize,
    pub extra: usize,
    /// Mean absolute error of matched hits
    pub mean_abs_error_ms: Option<f64>,
    pub accuracy: f64,
}

/// Expected notes for a run of patterns and the hits played against them
#[derive(Debug, Clone)]
pub struct PracticeSession {
    config: PracticeConfig,
    mapper: VoiceMapper,
    expected: Vec<ExpectedNote>,
    hits: Vec<PracticeHit>,
    length_ms: f64,
}

impl PracticeSession {
    /// Lay out the patterns at the configured tempo
    pub fn start(patterns: &[Pattern], config: PracticeConfig) -> Result<Self> {
        config.validate()?;
        let expected = build_expected_notes(patterns, config.bpm, &config.kit)?;
        let length_ms = timeline_length_ms(patterns, config.bpm)?;
        log::debug!(
            "practice session started: {} patterns, {} notes over {:.0}ms at {} bpm",
            patterns.len(),
            expected.len(),
            length_ms,
            config.bpm
        );

        Ok(PracticeSession {
            mapper: VoiceMapper::from_kit(&config.kit),
            config,
            expected,
            hits: Vec::new(),
            length_ms,
        })
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn expected_notes(&self) -> &[ExpectedNote] {
        &self.expected
    }

    pub fn hits(&self) -> &[PracticeHit] {
        &self.hits
    }

    pub fn length_ms(&self) -> f64 {
        self.length_ms
    }

    /// Record a hit at `time_ms` on the session clock.
    ///
    /// The configured latency is subtracted first. A hit within tolerance
    /// marks its expected note matched; anything else is an extra hit and
    /// leaves the expected list alone.
    pub fn register_hit(&mut self, time_ms: f64, voice: VoiceId) -> PracticeHit {
        let adjusted = time_ms - self.config.latency_ms;
        let found = match_hit(adjusted, voice, &self.expected, self.config.tolerance_ms);

        let classification = match found {
            Some(m) if m.matched => {
                self.expected[m.index].mark_matched();
                if m.error_ms.abs() <= self.config.perfect_window_ms {
                    HitClassification::Perfect
                } else if m.error_ms < 0.0 {
                    HitClassification::Early
                } else {
                    HitClassification::Late
                }
            }
            _ => HitClassification::Extra,
        };

        let hit = PracticeHit {
            time_ms: adjusted,
            voice,
            expected_index: found.map(|m| m.index),
            expected_time_ms: found.map(|m| self.expected[m.index].time_ms),
            error_ms: found.map(|m| m.error_ms),
            classification,
        };
        log::debug!("{} hit on {} at {:.1}ms", classification, voice.name(), adjusted);
        self.hits.push(hit.clone());
        hit
    }

    /// Record a MIDI note-on, resolving the note through the kit
    pub fn register_midi(&mut self, time_ms: f64, note: u8) -> PracticeHit {
        let voice = self.mapper.map(note);
        self.register_hit(time_ms, voice)
    }

    pub fn accuracy(&self) -> f64 {
        matching::accuracy(&self.expected)
    }

    /// Unmatched notes whose tolerance window closed before `now_ms`
    pub fn missed_notes(&self, now_ms: f64) -> Vec<&ExpectedNote> {
        self.expected
            .iter()
            .filter(|n| !n.matched && n.time_ms + self.config.tolerance_ms < now_ms)
            .collect()
    }

    /// Whether every note's window has closed by `now_ms`
    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms > self.length_ms + self.config.tolerance_ms
    }

    pub fn summary(&self) -> SessionSummary {
        let count = |class: HitClassification| {
            self.hits.iter().filter(|h| h.classification == class).count()
        };

        let errors: Vec<f64> = self
            .hits
            .iter()
            .filter(|h| h.classification != HitClassification::Extra)
            .filter_map(|h| h.error_ms)
            .map(f64::abs)
            .collect();
        let mean_abs_error_ms = if errors.is_empty() {
            None
        } else {
            Some(errors.iter().sum::<f64>() / errors.len() as f64)
        };

        SessionSummary {
            expected: self.expected.len(),
            matched: self.expected.iter().filter(|n| n.matched).count(),
            perfect: count(HitClassification::Perfect),
            early: count(HitClassification::Early),
            late: count(HitClassification::Late),
            extra: count(HitClassification::Extra),
            mean_abs_error_ms,
            accuracy: self.accuracy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PracticeError;
    use stickwork_notation::PatternText;

    /// Quarter notes at 120 bpm: K 0, S 500, K 1000, S 1500
    fn session(config: PracticeConfig) -> PracticeSession {
        let pattern = PatternText {
            subdivision: 4,
            voices: "K S".into(),
            ..PatternText::default()
        }
        .parse();
        PracticeSession::start(&[pattern], config).unwrap()
    }

    #[test]
    fn test_classification() {
        let mut session = session(PracticeConfig::default());

        let mut class = |time, voice| session.register_hit(time, voice).classification;
        assert_eq!(class(10.0, VoiceId::Kick), HitClassification::Perfect);
        assert_eq!(class(460.0, VoiceId::Snare), HitClassification::Early);
        assert_eq!(class(1050.0, VoiceId::Kick), HitClassification::Late);
        // Snare at 1500 is 300ms away
        let extra = session.register_hit(1200.0, VoiceId::Snare);
        assert_eq!(extra.classification, HitClassification::Extra);
        assert_eq!(extra.expected_index, Some(3));
        assert_eq!(extra.error_ms, Some(-300.0));

        let summary = session.summary();
        assert_eq!(summary.expected, 4);
        assert_eq!(summary.matched, 3);
        assert_eq!((summary.perfect, summary.early, summary.late, summary.extra), (1, 1, 1, 1));
        assert_eq!(summary.mean_abs_error_ms, Some((10.0 + 40.0 + 50.0) / 3.0));
        assert_eq!(summary.accuracy, 0.75);
    }

    #[test]
    fn test_matched_notes_stay_matched() {
        let mut session = session(PracticeConfig::default());
        session.register_hit(0.0, VoiceId::Kick);
        // The second kick is the only candidate left and is out of range
        let again = session.register_hit(0.0, VoiceId::Kick);
        assert_eq!(again.classification, HitClassification::Extra);
        assert_eq!(again.expected_index, Some(2));
        assert!(session.expected_notes()[0].matched);
        assert!(!session.expected_notes()[2].matched);
    }

    #[test]
    fn test_latency_is_subtracted() {
        let mut session = session(PracticeConfig::default().with_latency(30.0));
        let hit = session.register_hit(530.0, VoiceId::Snare);
        assert_eq!(hit.time_ms, 500.0);
        assert_eq!(hit.error_ms, Some(0.0));

        let mut session = self::session(PracticeConfig::default().with_latency(-20.0));
        let hit = session.register_hit(480.0, VoiceId::Snare);
        assert_eq!(hit.error_ms, Some(0.0));
    }

    #[test]
    fn test_hit_with_no_candidate() {
        let mut session = session(PracticeConfig::default());
        let hit = session.register_hit(0.0, VoiceId::Ride);
        assert_eq!(hit.classification, HitClassification::Extra);
        assert_eq!(hit.expected_index, None);
        assert_eq!(hit.error_ms, None);
        assert_eq!(session.summary().mean_abs_error_ms, None);
    }

    #[test]
    fn test_register_midi_uses_kit() {
        let mut session = session(PracticeConfig::default());
        assert_eq!(session.register_midi(500.0, 38).voice, VoiceId::Snare);
        // Side stick maps to the snare through the GM table
        assert_eq!(session.register_midi(1500.0, 37).voice, VoiceId::Snare);
        assert_eq!(session.accuracy(), 0.5);
    }

    #[test]
    fn test_missed_notes_and_finish() {
        let mut session = session(PracticeConfig::default());
        session.register_hit(0.0, VoiceId::Kick);

        let missed: Vec<usize> = session.missed_notes(700.0).iter().map(|n| n.index).collect();
        assert_eq!(missed, vec![1]);
        assert_eq!(session.missed_notes(2000.0).len(), 3);

        assert_eq!(session.length_ms(), 2000.0);
        assert!(!session.is_finished(2000.0));
        assert!(session.is_finished(2101.0));
    }

    #[test]
    fn test_invalid_config() {
        let pattern = Pattern::new(stickwork_core::TimeSignature::default(), 4);
        let result = PracticeSession::start(&[pattern], PracticeConfig::default().with_bpm(-1.0));
        assert!(matches!(result, Err(PracticeError::Timing(_))));
    }
}
