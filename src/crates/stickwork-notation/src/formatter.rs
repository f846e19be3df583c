// Formatter: convert patterns to and from their compact text fields
use serde::{Deserialize, Serialize};

use stickwork_core::TimeSignature;

use crate::codec::{format_phrase, join_tokens, parse_numeric_list, parse_phrase, parse_tokens};
use crate::pattern::{Pattern, PatternIssue};
use crate::token::{NoteToken, Sticking};

/// A pattern as stored or typed in: every field is plain text.
///
/// ```
/// use stickwork_notation::PatternText;
///
/// let text = PatternText {
///     time_signature: "7/8".into(),
///     subdivision: 16,
///     phrase: "4 4 6".into(),
///     voices: "S H H H".into(),
///     sticking: "R L".into(),
///     ..PatternText::default()
/// };
/// let pattern = text.parse();
/// assert_eq!(pattern.notes_per_bar().unwrap(), 14);
/// assert_eq!(stickwork_notation::format(&pattern), text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternText {
    pub time_signature: String,
    pub subdivision: u32,
    /// Space-separated per-beat subdivisions; empty for a uniform grid
    pub per_beat_subdivisions: String,
    pub phrase: String,
    pub voices: String,
    pub sticking: String,
    pub repeat: u32,
    pub left_foot: bool,
    pub right_foot: bool,
}

impl Default for PatternText {
    fn default() -> Self {
        PatternText {
            time_signature: "4/4".to_string(),
            subdivision: 16,
            per_beat_subdivisions: String::new(),
            phrase: String::new(),
            voices: String::new(),
            sticking: String::new(),
            repeat: 1,
            left_foot: false,
            right_foot: false,
        }
    }
}

impl PatternText {
    /// Read the text fields, substituting safe defaults for anything malformed.
    pub fn parse(&self) -> Pattern {
        let time_signature = TimeSignature::parse(&self.time_signature);
        let per_beat: Vec<u32> = parse_numeric_list(&self.per_beat_subdivisions)
            .into_iter()
            .map(|n| n.round() as u32)
            .filter(|&n| n > 0)
            .collect();

        let pattern = Pattern::new(time_signature, self.subdivision).with_per_beat(per_beat);
        let notes = pattern.notes_per_bar().unwrap_or(0);

        pattern
            .with_phrase(parse_phrase(&self.phrase, notes))
            .with_voices(
                parse_tokens(&self.voices)
                    .iter()
                    .map(|t| NoteToken::parse_lenient(t))
                    .collect(),
            )
            .with_sticking(
                parse_tokens(&self.sticking)
                    .iter()
                    .map(|t| Sticking::parse_lenient(t))
                    .collect(),
            )
            .with_repeat(self.repeat)
            .with_feet(self.left_foot, self.right_foot)
    }

    /// Unreadable tokens plus every issue of the parsed pattern
    pub fn validate(&self) -> Vec<PatternIssue> {
        let mut issues = Vec::new();

        for (index, text) in parse_tokens(&self.voices).into_iter().enumerate() {
            if let Err(e) = NoteToken::parse(&text) {
                issues.push(PatternIssue::UnreadableVoice {
                    index,
                    text,
                    reason: e.to_string(),
                });
            }
        }
        for (index, text) in parse_tokens(&self.sticking).into_iter().enumerate() {
            if let Err(e) = Sticking::parse(&text) {
                issues.push(PatternIssue::UnreadableSticking {
                    index,
                    text,
                    reason: e.to_string(),
                });
            }
        }

        issues.extend(self.parse().validate());
        issues
    }
}

impl From<&Pattern> for PatternText {
    fn from(pattern: &Pattern) -> Self {
        format(pattern)
    }
}

/// Render a pattern to text fields that parse back to the same pattern
pub fn format(pattern: &Pattern) -> PatternText {
    let per_beat = pattern
        .per_beat_subdivisions
        .as_deref()
        .map(|subs| join_tokens(&subs.iter().map(|s| s.to_string()).collect::<Vec<_>>()))
        .unwrap_or_default();

    PatternText {
        time_signature: pattern.time_signature.to_string(),
        subdivision: pattern.subdivision,
        per_beat_subdivisions: per_beat,
        phrase: format_phrase(&pattern.phrase),
        voices: format_notes(&pattern.voices),
        sticking: format_sticking(&pattern.sticking),
        repeat: pattern.repeat,
        left_foot: pattern.left_foot,
        right_foot: pattern.right_foot,
    }
}

pub fn format_notes(notes: &[NoteToken]) -> String {
    join_tokens(&notes.iter().map(|n| n.to_string()).collect::<Vec<_>>())
}

pub fn format_sticking(sticking: &[Sticking]) -> String {
    join_tokens(&sticking.iter().map(|s| s.to_string()).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickwork_core::VoiceId;

    fn roundtrip(text: PatternText) {
        let pattern = text.parse();
        let formatted = format(&pattern);
        assert_eq!(formatted, text, "format should reproduce the input");
        assert_eq!(formatted.parse(), pattern, "parse(format(p)) should equal p");
    }

    #[test]
    fn test_roundtrip_simple() {
        roundtrip(PatternText {
            phrase: "16".into(),
            voices: "S".into(),
            sticking: "R L".into(),
            ..PatternText::default()
        });
    }

    #[test]
    fn test_roundtrip_odd_meter() {
        roundtrip(PatternText {
            time_signature: "7/8".into(),
            phrase: "3 2 2 3 2 2".into(),
            voices: "K+S H (S) H H - H".into(),
            sticking: "R L (R) lR L - R".into(),
            repeat: 4,
            left_foot: true,
            ..PatternText::default()
        });
    }

    #[test]
    fn test_roundtrip_per_beat() {
        roundtrip(PatternText {
            time_signature: "3/4".into(),
            per_beat_subdivisions: "8 12 16".into(),
            phrase: "2 3 4".into(),
            voices: "S".into(),
            sticking: "R L".into(),
            ..PatternText::default()
        });
    }

    #[test]
    fn test_combined_tokens_are_normalized() {
        let text = PatternText {
            voices: "S+K".into(),
            ..PatternText::default()
        };
        let pattern = text.parse();
        assert_eq!(pattern.voices[0].voices, vec![VoiceId::Kick, VoiceId::Snare]);
        assert_eq!(format(&pattern).voices, "K+S");
    }

    #[test]
    fn test_malformed_fields_use_defaults() {
        let text = PatternText {
            time_signature: "waltz".into(),
            phrase: "a b".into(),
            voices: "S ?".into(),
            ..PatternText::default()
        };
        let pattern = text.parse();
        assert_eq!(pattern.time_signature, TimeSignature::new(4, 4));
        assert_eq!(pattern.phrase, vec![16]);
        assert!(pattern.voices[1].is_rest());
    }

    #[test]
    fn test_validate_reports_unreadable_tokens() {
        let text = PatternText {
            phrase: "16".into(),
            voices: "S X".into(),
            sticking: "R Q".into(),
            ..PatternText::default()
        };
        let issues = text.validate();
        assert!(matches!(
            &issues[0],
            PatternIssue::UnreadableVoice { index: 1, text, .. } if text == "X"
        ));
        assert!(matches!(
            &issues[1],
            PatternIssue::UnreadableSticking { index: 1, text, .. } if text == "Q"
        ));
        assert_eq!(issues.len(), 2);
    }
}
