//! The pattern model: one bar of grouped, voiced and sticked notes

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stickwork_core::{Grid, Limb, Result, TimeSignature, TimingError, VoiceId};

use crate::codec::{build_accent_indices, build_phrase_from_accents};
use crate::token::{NoteToken, Sticking};

/// A drum pattern, one bar long, played `repeat` times.
///
/// The voice and sticking lists may be shorter than the bar; they are repeated
/// cyclically. The same goes for the phrase: `[4]` over sixteen notes accents
/// every fourth note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub time_signature: TimeSignature,
    pub subdivision: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_beat_subdivisions: Option<Vec<u32>>,
    pub phrase: Vec<usize>,
    pub voices: Vec<NoteToken>,
    pub sticking: Vec<Sticking>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub left_foot: bool,
    #[serde(default)]
    pub right_foot: bool,
}

fn default_repeat() -> u32 {
    1
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::new(TimeSignature::default(), 16)
    }
}

impl Pattern {
    /// Single-stroke snare over the whole bar, accent on the downbeat
    pub fn new(time_signature: TimeSignature, subdivision: u32) -> Self {
        let notes = stickwork_core::notes_per_bar(time_signature, subdivision).unwrap_or(0);
        Pattern {
            time_signature,
            subdivision,
            per_beat_subdivisions: None,
            phrase: vec![notes.max(1)],
            voices: vec![NoteToken::single(VoiceId::Snare)],
            sticking: vec![Sticking::hand(Limb::RightHand), Sticking::hand(Limb::LeftHand)],
            repeat: 1,
            left_foot: false,
            right_foot: false,
        }
    }

    pub fn with_per_beat(mut self, subdivisions: Vec<u32>) -> Self {
        self.per_beat_subdivisions = if subdivisions.is_empty() {
            None
        } else {
            Some(subdivisions)
        };
        self
    }

    pub fn with_phrase(mut self, phrase: Vec<usize>) -> Self {
        self.phrase = phrase;
        self
    }

    /// Set the phrase from accent positions.
    pub fn with_accents(mut self, accents: &[usize]) -> Result<Self> {
        self.phrase = build_phrase_from_accents(accents, self.notes_per_bar()?)?;
        Ok(self)
    }

    pub fn with_voices(mut self, voices: Vec<NoteToken>) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_sticking(mut self, sticking: Vec<Sticking>) -> Self {
        self.sticking = sticking;
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_feet(mut self, left_foot: bool, right_foot: bool) -> Self {
        self.left_foot = left_foot;
        self.right_foot = right_foot;
        self
    }

    pub fn grid(&self) -> Result<Grid> {
        Grid::for_pattern(
            self.time_signature,
            self.subdivision,
            self.per_beat_subdivisions.as_deref(),
        )
    }

    pub fn notes_per_bar(&self) -> Result<usize> {
        Ok(self.grid()?.notes_per_bar())
    }

    pub fn is_per_beat(&self) -> bool {
        self.per_beat_subdivisions.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Accented positions in the bar, with the phrase repeated to fill it.
    pub fn accent_indices(&self) -> Result<Vec<usize>> {
        let notes = self.notes_per_bar()?;
        let groups: Vec<usize> = self.phrase.iter().copied().filter(|&g| g > 0).collect();
        let span: usize = groups.iter().sum();
        if span == 0 {
            return Ok(if notes > 0 { vec![0] } else { Vec::new() });
        }

        let offsets = build_accent_indices(&groups);
        let mut indices = Vec::new();
        let mut start = 0;
        while start < notes {
            indices.extend(offsets.iter().map(|o| start + o).filter(|&i| i < notes));
            start += span;
        }
        Ok(indices)
    }

    /// The sticking of every note of the bar; rests where none is given
    pub fn stickings(&self) -> Result<Vec<Sticking>> {
        let notes = self.notes_per_bar()?;
        Ok((0..notes)
            .map(|k| cyclic(&self.sticking, k).copied().unwrap_or_default())
            .collect())
    }

    /// Every note of the bar with its sticking folded in.
    pub fn notes(&self) -> Result<Vec<NoteToken>> {
        let stickings = self.stickings()?;
        Ok(stickings
            .iter()
            .enumerate()
            .map(|(k, sticking)| {
                cyclic(&self.voices, k)
                    .cloned()
                    .unwrap_or_default()
                    .with_sticking(sticking)
            })
            .collect())
    }

    /// Everything about this pattern that breaks the bar invariants.
    ///
    /// An empty list means the pattern is consistent.
    pub fn validate(&self) -> Vec<PatternIssue> {
        let mut issues = Vec::new();

        if self.repeat == 0 {
            issues.push(PatternIssue::ZeroRepeat);
        }

        let beats = self.time_signature.beats_per_bar() as usize;
        if let Some(per_beat) = &self.per_beat_subdivisions {
            if !per_beat.is_empty() && per_beat.len() != beats {
                issues.push(PatternIssue::PerBeatCount {
                    beats,
                    found: per_beat.len(),
                });
            }
        }

        let notes = match self.notes_per_bar() {
            Ok(n) if n > 0 => n,
            Ok(_) => {
                issues.push(PatternIssue::InvalidGrid(TimingError::zero("notes per bar")));
                return issues;
            }
            Err(e) => {
                issues.push(PatternIssue::InvalidGrid(e));
                return issues;
            }
        };

        let phrase_total: usize = self.phrase.iter().sum();
        if !fits_cyclically(phrase_total, notes) {
            issues.push(PatternIssue::PhraseLength { notes, phrase_total });
        }
        if !fits_cyclically(self.voices.len(), notes) {
            issues.push(PatternIssue::VoiceCount {
                notes,
                count: self.voices.len(),
            });
        }
        if !fits_cyclically(self.sticking.len(), notes) {
            issues.push(PatternIssue::StickingCount {
                notes,
                count: self.sticking.len(),
            });
        }

        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// A broken invariant found by [`Pattern::validate`]
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum PatternIssue {
    #[error("invalid grid: {0}")]
    InvalidGrid(#[serde(serialize_with = "display")] TimingError),

    #[error("{found} per-beat subdivisions given for a bar of {beats} beats")]
    PerBeatCount { beats: usize, found: usize },

    #[error("phrase covers {phrase_total} notes, which does not tile a bar of {notes}")]
    PhraseLength { notes: usize, phrase_total: usize },

    #[error("{count} voice tokens do not tile a bar of {notes} notes")]
    VoiceCount { notes: usize, count: usize },

    #[error("{count} sticking tokens do not tile a bar of {notes} notes")]
    StickingCount { notes: usize, count: usize },

    #[error("repeat count must be at least 1")]
    ZeroRepeat,

    #[error("voice token {index} ('{text}') is unreadable: {reason}")]
    UnreadableVoice {
        index: usize,
        text: String,
        reason: String,
    },

    #[error("sticking token {index} ('{text}') is unreadable: {reason}")]
    UnreadableSticking {
        index: usize,
        text: String,
        reason: String,
    },
}

fn display<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

fn cyclic<T>(items: &[T], index: usize) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(index % items.len())
    }
}

/// A sequence of `len` items repeated a whole number of times fills `notes`
fn fits_cyclically(len: usize, notes: usize) -> bool {
    len > 0 && len <= notes && notes % len == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven_eight() -> Pattern {
        Pattern::new(TimeSignature::new(7, 8), 16)
            .with_phrase(vec![4, 4, 6])
            .with_voices(vec![NoteToken::single(VoiceId::Snare)])
    }

    #[test]
    fn test_new_pattern_is_valid() {
        let pattern = Pattern::default();
        assert_eq!(pattern.notes_per_bar().unwrap(), 16);
        assert_eq!(pattern.phrase, vec![16]);
        assert!(pattern.is_valid(), "{:?}", pattern.validate());
    }

    #[test]
    fn test_accent_indices() {
        assert_eq!(seven_eight().accent_indices().unwrap(), vec![0, 4, 8]);

        let cyclic = Pattern::default().with_phrase(vec![4]);
        assert_eq!(cyclic.accent_indices().unwrap(), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_with_accents() {
        let pattern = Pattern::new(TimeSignature::new(4, 4), 8)
            .with_accents(&[0, 3, 6, 99])
            .unwrap();
        assert_eq!(pattern.phrase, vec![3, 3, 2]);
        assert_eq!(pattern.accent_indices().unwrap(), vec![0, 3, 6]);
    }

    #[test]
    fn test_notes_cycle_voices_and_sticking() {
        let pattern = Pattern::new(TimeSignature::new(2, 4), 8)
            .with_voices(vec![
                NoteToken::single(VoiceId::Kick),
                NoteToken::parse("(S)").unwrap(),
            ])
            .with_sticking(vec![Sticking::parse("lR").unwrap(), Sticking::hand(Limb::LeftHand)]);

        let notes = pattern.notes().unwrap();
        assert_eq!(notes.len(), 4);
        assert_eq!(notes[0].voices, vec![VoiceId::Kick]);
        assert!(notes[0].has_ornament_prefix);
        assert!(notes[1].is_ghost);
        assert!(notes[2].has_ornament_prefix);
    }

    #[test]
    fn test_per_beat_pattern() {
        let pattern = Pattern::new(TimeSignature::new(2, 4), 16).with_per_beat(vec![8, 12]);
        assert!(pattern.is_per_beat());
        assert_eq!(pattern.notes_per_bar().unwrap(), 5);
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let pattern = Pattern::new(TimeSignature::new(4, 4), 16)
            .with_phrase(vec![3, 3])
            .with_voices(vec![NoteToken::rest(); 3])
            .with_sticking(Vec::new())
            .with_repeat(0);

        let issues = pattern.validate();
        assert!(issues.contains(&PatternIssue::ZeroRepeat));
        assert!(issues.contains(&PatternIssue::PhraseLength {
            notes: 16,
            phrase_total: 6
        }));
        assert!(issues.contains(&PatternIssue::VoiceCount { notes: 16, count: 3 }));
        assert!(issues.contains(&PatternIssue::StickingCount { notes: 16, count: 0 }));
    }

    #[test]
    fn test_validate_per_beat_count() {
        let pattern = Pattern::new(TimeSignature::new(3, 4), 16)
            .with_per_beat(vec![16, 8])
            .with_phrase(vec![10]);
        // [16, 8] is repeated to [16, 8, 16]: ten notes, but the list is still reported
        assert_eq!(
            pattern.validate(),
            vec![PatternIssue::PerBeatCount { beats: 3, found: 2 }]
        );
    }

    #[test]
    fn test_validate_zero_subdivision() {
        let pattern = Pattern::new(TimeSignature::new(4, 4), 0);
        assert!(matches!(pattern.validate()[0], PatternIssue::InvalidGrid(_)));
    }

    #[test]
    fn test_serde_round_trip() {
        let pattern = seven_eight().with_feet(true, false);
        let json = serde_json::to_string(&pattern).unwrap();
        let back: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
