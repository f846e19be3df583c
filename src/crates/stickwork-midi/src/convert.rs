//! Turn a raw drum recording into pattern notation, one measure at a time
//!
//! Each measure gets its own subdivision detection, so a fill in sixteenths
//! after a groove in eighths is written on the finer grid only where it
//! happens.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use stickwork_core::time_signature::notes_per_beat;
use stickwork_core::{detect_subdivisions, ms_per_beat, TimeSignature, VoiceId, VoiceMapper};
use stickwork_notation::{NoteToken, Pattern, Sticking};

use crate::error::Result;
use crate::midi::{MidiRecordedNote, MidiRecording};

/// Same-voice onsets closer than this are one stroke
pub const DEFAULT_DEDUPE_MS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub time_signature: TimeSignature,
    pub dedupe_ms: f64,
    /// Single-voice cells quieter than this become ghost notes
    pub ghost_velocity: Option<u8>,
    pub mapper: VoiceMapper,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            time_signature: TimeSignature::default(),
            dedupe_ms: DEFAULT_DEDUPE_MS,
            ghost_velocity: None,
            mapper: VoiceMapper::default(),
        }
    }
}

/// One measure of converted notation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedMeasure {
    /// Measure number in the recording, counting from zero
    pub index: usize,
    /// Notes per beat, one group per beat
    pub phrase: Vec<usize>,
    pub voices: Vec<NoteToken>,
    /// The measure's subdivision, or its finest one when beats differ
    pub subdivision: u32,
    /// Present only when the beats use different subdivisions
    pub subdivisions: Option<Vec<u32>>,
    /// False when the detector had to guess
    pub detected: bool,
}

impl ConvertedMeasure {
    pub fn to_pattern(&self, time_signature: TimeSignature) -> Pattern {
        let uniform = Pattern::new(time_signature, self.subdivision);
        let per_beat = match &self.subdivisions {
            Some(subs) => subs.clone(),
            // A uniform grid rounds differently from per-beat counts in some meters
            None if uniform.notes_per_bar().ok() != Some(self.voices.len()) => {
                vec![self.subdivision; time_signature.beats_per_bar() as usize]
            }
            None => Vec::new(),
        };

        uniform
            .with_per_beat(per_beat)
            .with_phrase(self.phrase.clone())
            .with_voices(self.voices.clone())
            .with_sticking(vec![Sticking::default()])
    }
}

#[derive(Debug, Clone, Copy)]
struct Stroke {
    time_ms: f64,
    voice: VoiceId,
    velocity: u8,
}

pub fn convert_recording(
    recording: &MidiRecording,
    options: &ConvertOptions,
) -> Result<Vec<ConvertedMeasure>> {
    convert(&recording.notes, recording.bpm, options)
}

/// Convert recorded notes to per-measure notation. Measures without notes are skipped.
pub fn convert(
    notes: &[MidiRecordedNote],
    bpm: f64,
    options: &ConvertOptions,
) -> Result<Vec<ConvertedMeasure>> {
    let beat_ms = ms_per_beat(bpm)?;
    let ts = options.time_signature;
    let measure_ms = beat_ms * ts.beats_per_bar() as f64;

    let mut strokes: Vec<Stroke> = notes
        .iter()
        .filter(|n| n.time_ms.is_finite() && n.time_ms >= 0.0)
        .map(|n| Stroke {
            time_ms: n.time_ms,
            voice: options.mapper.map(n.note),
            velocity: n.velocity,
        })
        .collect();
    strokes.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
    let strokes = dedupe(strokes, options.dedupe_ms);

    let mut by_measure: BTreeMap<usize, Vec<Stroke>> = BTreeMap::new();
    for stroke in strokes {
        let measure = (stroke.time_ms / measure_ms).floor() as usize;
        by_measure.entry(measure).or_default().push(Stroke {
            time_ms: stroke.time_ms - measure as f64 * measure_ms,
            ..stroke
        });
    }

    by_measure
        .into_iter()
        .map(|(index, strokes)| convert_measure(index, &strokes, bpm, beat_ms, options))
        .collect()
}

/// Drop strokes that repeat the same voice within the window; the kept stroke
/// takes the louder velocity.
fn dedupe(strokes: Vec<Stroke>, window_ms: f64) -> Vec<Stroke> {
    let mut kept: Vec<Stroke> = Vec::with_capacity(strokes.len());
    let mut last_by_voice: HashMap<VoiceId, usize> = HashMap::new();

    for stroke in strokes {
        if let Some(&i) = last_by_voice.get(&stroke.voice) {
            if stroke.time_ms - kept[i].time_ms < window_ms {
                kept[i].velocity = kept[i].velocity.max(stroke.velocity);
                continue;
            }
        }
        last_by_voice.insert(stroke.voice, kept.len());
        kept.push(stroke);
    }
    kept
}

fn convert_measure(
    index: usize,
    strokes: &[Stroke],
    bpm: f64,
    beat_ms: f64,
    options: &ConvertOptions,
) -> Result<ConvertedMeasure> {
    let ts = options.time_signature;
    let onsets: Vec<f64> = strokes.iter().map(|s| s.time_ms).collect();
    let detection = detect_subdivisions(&onsets, bpm, ts)?;
    let per_beat = detection
        .subdivisions
        .iter()
        .map(|&sub| notes_per_beat(ts, sub))
        .collect::<stickwork_core::Result<Vec<usize>>>()?;

    let starts: Vec<usize> = per_beat
        .iter()
        .scan(0, |acc, &n| {
            let start = *acc;
            *acc += n;
            Some(start)
        })
        .collect();
    let total: usize = per_beat.iter().sum();

    let mut cells: Vec<(BTreeSet<VoiceId>, u8)> = vec![(BTreeSet::new(), 0); total];
    for stroke in strokes {
        let cell = quantize(stroke.time_ms, beat_ms, &per_beat, &starts);
        let (voices, velocity) = &mut cells[cell];
        voices.insert(stroke.voice);
        *velocity = (*velocity).max(stroke.velocity);
    }

    let voices = cells
        .into_iter()
        .map(|(voices, velocity)| {
            let ghost = options
                .ghost_velocity
                .is_some_and(|threshold| voices.len() == 1 && velocity < threshold);
            let token = NoteToken::combined(voices);
            if ghost {
                token.ghosted()
            } else {
                token
            }
        })
        .collect();

    log::debug!(
        "measure {}: subdivisions {:?} (detected: {})",
        index,
        detection.subdivisions,
        detection.detected
    );

    let uniform = detection.is_uniform();
    Ok(ConvertedMeasure {
        index,
        phrase: per_beat,
        voices,
        subdivision: if uniform {
            detection.subdivisions.first().copied().unwrap_or_else(|| detection.finest())
        } else {
            detection.finest()
        },
        subdivisions: if uniform {
            None
        } else {
            Some(detection.subdivisions)
        },
        detected: detection.detected,
    })
}

/// Cell index of an onset within its measure.
///
/// Rounding up past the last cell of a beat moves the onset to the next beat's
/// first cell; past the end of the measure it stays on the last cell.
fn quantize(time_ms: f64, beat_ms: f64, per_beat: &[usize], starts: &[usize]) -> usize {
    let beats = per_beat.len();
    let mut beat = ((time_ms / beat_ms).floor() as usize).min(beats - 1);
    let offset = time_ms - beat as f64 * beat_ms;
    let step = beat_ms / per_beat[beat] as f64;
    let mut cell = (offset / step).round() as usize;

    if cell >= per_beat[beat] {
        if beat + 1 < beats {
            beat += 1;
            cell = 0;
        } else {
            cell = per_beat[beat] - 1;
        }
    }
    starts[beat] + cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickwork_notation::formatter::format_notes;

    fn note(time_ms: f64, note: u8) -> MidiRecordedNote {
        MidiRecordedNote {
            time_ms,
            note,
            velocity: 100,
        }
    }

    fn voices(measure: &ConvertedMeasure) -> String {
        format_notes(&measure.voices)
    }

    #[test]
    fn test_rock_beat() {
        let mut notes = vec![note(0.0, 36), note(1000.0, 36), note(500.0, 38), note(1500.0, 38)];
        notes.extend((0..8).map(|i| note(i as f64 * 250.0, 42)));

        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        assert_eq!(measures.len(), 1);
        let measure = &measures[0];
        assert_eq!(measure.phrase, vec![2, 2, 2, 2]);
        assert_eq!(measure.subdivision, 8);
        assert_eq!(measure.subdivisions, None);
        assert!(measure.detected);
        assert_eq!(voices(measure), "K+H H S+H H K+H H S+H H");
    }

    #[test]
    fn test_same_voice_duplicates_collapse() {
        let notes = vec![note(0.0, 38), note(3.0, 38), note(250.0, 38)];
        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        assert_eq!(voices(&measures[0]), "S S - - - - - -");
    }

    #[test]
    fn test_late_onset_moves_to_next_beat() {
        let notes = vec![note(0.0, 42), note(250.0, 42), note(490.0, 38)];
        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        assert_eq!(voices(&measures[0]), "H H S - - - - -");
    }

    #[test]
    fn test_onset_at_end_of_measure_is_clamped() {
        let notes = vec![note(0.0, 36), note(250.0, 42), note(1990.0, 38)];
        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        let measure = &measures[0];
        assert_eq!(measure.subdivisions, Some(vec![8, 4, 4, 4]));
        assert_eq!(measure.subdivision, 8);
        assert_eq!(measure.phrase, vec![2, 1, 1, 1]);
        assert_eq!(voices(measure), "K H - - S");
    }

    #[test]
    fn test_empty_measures_are_skipped() {
        let notes = vec![note(0.0, 36), note(250.0, 36), note(4000.0, 38), note(4250.0, 38)];
        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        let indices: Vec<usize> = measures.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_unknown_notes_use_fallback_voice() {
        let notes = vec![note(0.0, 127), note(250.0, 127)];
        let options = ConvertOptions {
            mapper: VoiceMapper::new().with_fallback(VoiceId::Crash),
            ..ConvertOptions::default()
        };
        let measures = convert(&notes, 120.0, &options).unwrap();
        assert_eq!(measures[0].voices[0], NoteToken::single(VoiceId::Crash));
    }

    #[test]
    fn test_quiet_notes_become_ghosts() {
        let notes = vec![
            note(0.0, 38),
            MidiRecordedNote {
                time_ms: 250.0,
                note: 38,
                velocity: 30,
            },
            MidiRecordedNote {
                time_ms: 500.0,
                note: 38,
                velocity: 30,
            },
            MidiRecordedNote {
                time_ms: 500.0,
                note: 36,
                velocity: 30,
            },
        ];
        let options = ConvertOptions {
            ghost_velocity: Some(50),
            ..ConvertOptions::default()
        };
        let measures = convert(&notes, 120.0, &options).unwrap();
        let text = voices(&measures[0]);
        assert!(text.starts_with("S (S) K+S"), "{}", text);
    }

    #[test]
    fn test_to_pattern_is_valid() {
        let notes = vec![note(0.0, 36), note(250.0, 42), note(1990.0, 38)];
        let measures = convert(&notes, 120.0, &ConvertOptions::default()).unwrap();
        let pattern = measures[0].to_pattern(TimeSignature::default());
        assert!(pattern.is_valid(), "{:?}", pattern.validate());
        assert_eq!(pattern.notes_per_bar().unwrap(), 5);
    }

    #[test]
    fn test_invalid_tempo() {
        assert!(convert(&[note(0.0, 36)], 0.0, &ConvertOptions::default()).is_err());
    }
}
