//! Polyrhythm calculator
//!
//! Two voices split the same bar evenly: the "right" voice into `numerator`
//! notes and the "left" voice into `denominator` notes. Positions are computed
//! with exact fractions and exposed as beats (`f64`) for renderers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TimingError};
use crate::fraction::{lcm, Fraction};
use crate::kit::{Limb, VoiceId};
use crate::time_signature::TimeSignature;

/// Two positions closer than this (in beats) are played together
pub const ALIGNMENT_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolyrhythmRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl PolyrhythmRatio {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 {
            return Err(TimingError::zero("polyrhythm numerator"));
        }
        if denominator == 0 {
            return Err(TimingError::zero("polyrhythm denominator"));
        }
        Ok(PolyrhythmRatio {
            numerator,
            denominator,
        })
    }

    /// Parse `"3:2"` (or `"3/2"`); `None` unless both sides are positive integers
    pub fn parse(input: &str) -> Option<Self> {
        let (num, den) = input.split_once([':', '/'])?;
        let num = num.trim().parse().ok()?;
        let den = den.trim().parse().ok()?;
        PolyrhythmRatio::new(num, den).ok()
    }

    pub fn cycle_length(&self) -> u64 {
        lcm(self.numerator as i64, self.denominator as i64) as u64
    }
}

impl fmt::Display for PolyrhythmRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePositions {
    pub right: Vec<f64>,
    pub left: Vec<f64>,
}

/// A right-voice note and a left-voice note that land on the same beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub right_index: usize,
    pub left_index: usize,
    pub beat: f64,
}

fn exact_positions(count: u32, beats_per_bar: u32) -> Vec<Fraction> {
    (0..count)
        .map(|i| Fraction::new(i as i64 * beats_per_bar as i64, count as i64))
        .collect()
}

fn check_counts(numerator: u32, denominator: u32, beats_per_bar: u32) -> Result<()> {
    PolyrhythmRatio::new(numerator, denominator)?;
    if beats_per_bar == 0 {
        return Err(TimingError::zero("beats per bar"));
    }
    Ok(())
}

/// Beat positions of both voices.
///
/// # Examples
/// ```
/// use stickwork_core::polyrhythm::positions;
///
/// let p = positions(4, 3, 4).unwrap();
/// assert_eq!(p.right, vec![0.0, 1.0, 2.0, 3.0]);
/// assert_eq!(p.left.len(), 3);
/// assert!((p.left[1] - 4.0 / 3.0).abs() < 1e-9);
/// ```
pub fn positions(numerator: u32, denominator: u32, beats_per_bar: u32) -> Result<VoicePositions> {
    check_counts(numerator, denominator, beats_per_bar)?;
    let to_beats = |fs: Vec<Fraction>| fs.iter().map(Fraction::to_float).collect();
    Ok(VoicePositions {
        right: to_beats(exact_positions(numerator, beats_per_bar)),
        left: to_beats(exact_positions(denominator, beats_per_bar)),
    })
}

/// Every `(i, j)` pair whose positions differ by less than [`ALIGNMENT_EPSILON`]
pub fn alignments(right: &[f64], left: &[f64]) -> Vec<Alignment> {
    let mut found = Vec::new();
    for (i, &a) in right.iter().enumerate() {
        for (j, &b) in left.iter().enumerate() {
            if (a - b).abs() < ALIGNMENT_EPSILON {
                found.push(Alignment {
                    right_index: i,
                    left_index: j,
                    beat: a,
                });
            }
        }
    }
    found
}

/// Number of pulses after which both voices line up again: `lcm(n, m)`
pub fn cycle_length(numerator: u32, denominator: u32) -> Result<u64> {
    Ok(PolyrhythmRatio::new(numerator, denominator)?.cycle_length())
}

/// Note values (in beats) that can be written without a tuplet
pub fn standard_durations(beat_unit: u32) -> [Fraction; 6] {
    if beat_unit >= 8 {
        [
            Fraction::from_int(3),
            Fraction::new(3, 2),
            Fraction::from_int(1),
            Fraction::new(1, 2),
            Fraction::new(1, 4),
            Fraction::new(1, 8),
        ]
    } else {
        [
            Fraction::from_int(4),
            Fraction::from_int(2),
            Fraction::from_int(1),
            Fraction::new(1, 2),
            Fraction::new(1, 4),
            Fraction::new(1, 8),
        ]
    }
}

fn is_standard(duration: Fraction, beat_unit: u32) -> bool {
    standard_durations(beat_unit).contains(&duration)
}

/// Closest standard value; ties go to the longer value
fn nearest_standard(duration: Fraction, beat_unit: u32) -> Fraction {
    let candidates = standard_durations(beat_unit);
    let mut best = candidates[0];
    for candidate in candidates.into_iter().skip(1) {
        if (candidate - duration).abs() < (best - duration).abs() {
            best = candidate;
        }
    }
    best
}

/// `num_notes` in the time of `notes_occupied` notes of the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupletConfig {
    pub num_notes: u32,
    pub notes_occupied: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDuration {
    pub count: u32,
    /// Actual length of each note in beats
    pub duration_beats: f64,
    /// Written note value in beats (equals `duration_beats` without a tuplet)
    pub base_duration_beats: f64,
    pub needs_tuplet: bool,
    pub tuplet_config: Option<TupletConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyrhythmDurations {
    pub right: VoiceDuration,
    pub left: VoiceDuration,
}

fn resolve_duration(
    count: u32,
    other_count: u32,
    beats_per_bar: u32,
    beat_unit: u32,
) -> VoiceDuration {
    let beats = Fraction::from_int(beats_per_bar as i64);
    let duration = Fraction::new(beats_per_bar as i64, count as i64);

    if is_standard(duration, beat_unit) {
        return VoiceDuration {
            count,
            duration_beats: duration.to_float(),
            base_duration_beats: duration.to_float(),
            needs_tuplet: false,
            tuplet_config: None,
        };
    }

    let other = Fraction::new(beats_per_bar as i64, other_count as i64);
    let (base, notes_occupied) = if is_standard(other, beat_unit) {
        (other, other_count)
    } else {
        let nearest = nearest_standard(duration, beat_unit);
        let occupied = (beats / nearest).round().max(1) as u32;
        (nearest, occupied)
    };

    VoiceDuration {
        count,
        duration_beats: duration.to_float(),
        base_duration_beats: base.to_float(),
        needs_tuplet: true,
        tuplet_config: Some(TupletConfig {
            num_notes: count,
            notes_occupied,
        }),
    }
}

/// Written durations and tuplets for both voices.
///
/// A voice whose note length is a standard value is written plainly. Otherwise
/// it becomes a tuplet, based on the other voice's note value when that one is
/// standard, or on the standard value nearest its own length when it is not.
pub fn durations(
    numerator: u32,
    denominator: u32,
    beats_per_bar: u32,
    beat_unit: u32,
) -> Result<PolyrhythmDurations> {
    check_counts(numerator, denominator, beats_per_bar)?;
    Ok(PolyrhythmDurations {
        right: resolve_duration(numerator, denominator, beats_per_bar, beat_unit),
        left: resolve_duration(denominator, numerator, beats_per_bar, beat_unit),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyrhythmVoice {
    pub positions: Vec<f64>,
    pub limb: Limb,
    pub sound: VoiceId,
    pub accents: Vec<usize>,
}

/// Everything a renderer or practice session needs about one polyrhythm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyrhythm {
    pub ratio: PolyrhythmRatio,
    pub time_signature: TimeSignature,
    pub right: PolyrhythmVoice,
    pub left: PolyrhythmVoice,
    pub alignments: Vec<Alignment>,
    pub cycle_length: u64,
    pub durations: PolyrhythmDurations,
}

impl Polyrhythm {
    /// Right hand plays the hi-hat, left hand the snare; each voice is accented on its downbeat.
    pub fn new(ratio: PolyrhythmRatio, time_signature: TimeSignature) -> Result<Self> {
        let beats = time_signature.beats_per_bar();
        let positions = positions(ratio.numerator, ratio.denominator, beats)?;
        let durations = durations(
            ratio.numerator,
            ratio.denominator,
            beats,
            time_signature.denominator,
        )?;
        let alignments = alignments(&positions.right, &positions.left);

        Ok(Polyrhythm {
            ratio,
            time_signature,
            right: PolyrhythmVoice {
                positions: positions.right,
                limb: Limb::RightHand,
                sound: VoiceId::HiHat,
                accents: vec![0],
            },
            left: PolyrhythmVoice {
                positions: positions.left,
                limb: Limb::LeftHand,
                sound: VoiceId::Snare,
                accents: vec![0],
            },
            alignments,
            cycle_length: ratio.cycle_length(),
            durations,
        })
    }

    pub fn with_sounds(mut self, right: VoiceId, left: VoiceId) -> Self {
        self.right.sound = right;
        self.left.sound = left;
        self
    }

    pub fn with_limbs(mut self, right: Limb, left: Limb) -> Self {
        self.right.limb = right;
        self.left.limb = left;
        self
    }
}
