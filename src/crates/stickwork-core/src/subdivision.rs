//! Infer the subdivision a performer was playing from raw onset times
//!
//! Each beat is judged on its own, so a take that moves from eighths into
//! triplets yields a different subdivision per beat.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ms_per_beat, Result};
use crate::time_signature::{fit_to_beats, TimeSignature};

/// Grids tried for beats with more than one onset, coarsest first
pub const CANDIDATE_SUBDIVISIONS: [u32; 6] = [4, 8, 12, 16, 24, 32];

/// Returned for every beat when there is too little input to judge
pub const DEFAULT_SUBDIVISION: u32 = 16;

pub const QUARTER: u32 = 4;
pub const EIGHTH: u32 = 8;

/// Onsets closer than this are one stroke (flams, layered voices)
const SIMULTANEOUS_MS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdivisionDetection {
    /// One entry per beat of the bar
    pub subdivisions: Vec<u32>,
    /// False when the input was too sparse or some beat fit no grid
    pub detected: bool,
}

impl SubdivisionDetection {
    fn fallback(beats: usize) -> Self {
        SubdivisionDetection {
            subdivisions: vec![DEFAULT_SUBDIVISION; beats],
            detected: false,
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.subdivisions.windows(2).all(|w| w[0] == w[1])
    }

    /// The finest subdivision used anywhere in the bar
    pub fn finest(&self) -> u32 {
        self.subdivisions.iter().copied().max().unwrap_or(DEFAULT_SUBDIVISION)
    }
}

/// Detect the subdivision of every beat in a take.
///
/// # Arguments
/// * `onsets_ms` - onset times in milliseconds from the start of the take
/// * `bpm` - tempo, counting beats of the time signature's denominator
/// * `ts` - the meter; the result always has `ts.numerator` entries
///
/// # Examples
/// ```
/// use stickwork_core::{detect_subdivisions, TimeSignature};
///
/// let result = detect_subdivisions(&[0.0, 250.0], 120.0, TimeSignature::new(4, 4)).unwrap();
/// // Only the first beat was played; its grid is repeated across the bar
/// assert_eq!(result.subdivisions, vec![8, 8, 8, 8]);
/// assert!(result.detected);
/// ```
pub fn detect_subdivisions(
    onsets_ms: &[f64],
    bpm: f64,
    ts: TimeSignature,
) -> Result<SubdivisionDetection> {
    let beat_ms = ms_per_beat(bpm)?;
    let beats = ts.beats_per_bar() as usize;

    let onsets = collapse_simultaneous(onsets_ms);
    if onsets.len() < 2 {
        return Ok(SubdivisionDetection::fallback(beats));
    }

    // Onsets past the bar cannot change the result
    let mut by_beat: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for &t in &onsets {
        let beat = (t / beat_ms).floor();
        if beat >= beats as f64 {
            continue;
        }
        let beat = beat as usize;
        by_beat.entry(beat).or_default().push(t - beat as f64 * beat_ms);
    }

    let Some(&last_beat) = by_beat.keys().next_back() else {
        log::debug!("no onsets within the first {} beats", beats);
        return Ok(SubdivisionDetection::fallback(beats));
    };
    let mut sequence = vec![QUARTER; last_beat + 1];
    let mut detected = true;

    for (&beat, offsets) in &by_beat {
        sequence[beat] = if offsets.len() == 1 {
            classify_single(offsets[0], beat_ms)
        } else {
            match fit_grid(offsets, beat_ms, ts.denominator) {
                Some(sub) => sub,
                None => {
                    log::debug!("beat {} fits no candidate grid, assuming quarters", beat);
                    detected = false;
                    QUARTER
                }
            }
        };
    }

    Ok(SubdivisionDetection {
        subdivisions: fit_to_beats(&sequence, beats),
        detected,
    })
}

fn collapse_simultaneous(onsets_ms: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = onsets_ms
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut kept: Vec<f64> = Vec::with_capacity(sorted.len());
    for t in sorted {
        match kept.last() {
            Some(&prev) if t - prev < SIMULTANEOUS_MS => {}
            _ => kept.push(t),
        }
    }
    kept
}

/// Lone onset in a beat: on the beat is a quarter, on the "and" is an eighth
fn classify_single(offset_ms: f64, beat_ms: f64) -> u32 {
    let half = beat_ms / 2.0;
    let quarter_tolerance = (0.12 * beat_ms).max(20.0);
    let eighth_tolerance = (0.18 * half).max(15.0);

    // Distance to the nearer beat boundary
    let from_beat = offset_ms.min(beat_ms - offset_ms).abs();
    let from_half = (offset_ms - half).abs();

    let fits_quarter = from_beat <= quarter_tolerance;
    let fits_eighth = from_half <= eighth_tolerance;

    match (fits_quarter, fits_eighth) {
        (true, false) => QUARTER,
        (false, true) => EIGHTH,
        _ => {
            if from_beat <= 0.25 * beat_ms {
                QUARTER
            } else if from_half <= 0.30 * half {
                EIGHTH
            } else {
                QUARTER
            }
        }
    }
}

/// Pick the candidate grid that every onset-to-onset interval snaps onto
/// with the least total error.
fn fit_grid(offsets: &[f64], beat_ms: f64, denominator: u32) -> Option<u32> {
    let intervals: Vec<f64> = offsets.windows(2).map(|w| w[1] - w[0]).collect();
    if intervals.is_empty() {
        return None;
    }

    let average = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let sixteenth_ms = spacing_ms(16, beat_ms, denominator);
    let tolerance_ratio = if average < sixteenth_ms { 0.25 } else { 0.15 };

    let mut best: Option<(u32, f64)> = None;
    for &sub in &CANDIDATE_SUBDIVISIONS {
        let spacing = spacing_ms(sub, beat_ms, denominator);
        let tolerance = tolerance_ratio * spacing;

        let mut total_error = 0.0;
        let fits = intervals.iter().all(|&interval| {
            let steps = (interval / spacing).round();
            let error = (interval - steps * spacing).abs();
            total_error += error;
            steps >= 1.0 && error <= tolerance
        });

        // A finer grid has to beat the coarser one outright
        if fits && best.map_or(true, |(_, err)| total_error + 1e-9 < err) {
            best = Some((sub, total_error));
        }
    }

    best.map(|(sub, _)| sub)
}

/// Milliseconds between grid lines of a subdivision
fn spacing_ms(subdivision: u32, beat_ms: f64, denominator: u32) -> f64 {
    beat_ms * denominator as f64 / subdivision as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_four() -> TimeSignature {
        TimeSignature::new(4, 4)
    }

    #[test]
    fn test_two_onsets_a_half_beat_apart_are_eighths() {
        let result = detect_subdivisions(&[0.0, 250.0], 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions[0], 8);
        assert_eq!(result.finest(), 8);
        assert!(result.detected);
    }

    #[test]
    fn test_degenerate_input() {
        let empty = detect_subdivisions(&[], 120.0, four_four()).unwrap();
        assert_eq!(empty.subdivisions, vec![16; 4]);
        assert!(!empty.detected);

        let single = detect_subdivisions(&[100.0], 120.0, TimeSignature::new(3, 4)).unwrap();
        assert_eq!(single.subdivisions, vec![16; 3]);
        assert!(!single.detected);

        // Two strokes inside the simultaneity window count as one
        let flam = detect_subdivisions(&[0.0, 2.0], 120.0, four_four()).unwrap();
        assert!(!flam.detected);
    }

    #[test]
    fn test_invalid_tempo_is_rejected() {
        assert!(detect_subdivisions(&[0.0, 250.0], 0.0, four_four()).is_err());
    }

    #[test]
    fn test_sixteenths_and_triplets_per_beat() {
        // Beat 0: sixteenths, beat 1: eighth triplets
        let onsets = [0.0, 125.0, 250.0, 375.0, 500.0, 666.7, 833.3];
        let result = detect_subdivisions(&onsets, 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions, vec![16, 12, 16, 12]);
        assert!(!result.is_uniform());
    }

    #[test]
    fn test_humanized_sixteenths() {
        let onsets = [3.0, 131.0, 246.0, 380.0, 502.0, 622.0, 757.0, 870.0];
        let result = detect_subdivisions(&onsets, 120.0, TimeSignature::new(2, 4)).unwrap();
        assert_eq!(result.subdivisions, vec![16, 16]);
    }

    #[test]
    fn test_single_onsets() {
        // On the beat, then on the "and" of the next beat
        let onsets = [0.0, 750.0];
        let result = detect_subdivisions(&onsets, 120.0, TimeSignature::new(2, 4)).unwrap();
        assert_eq!(result.subdivisions, vec![4, 8]);
    }

    #[test]
    fn test_single_onset_floors_at_fast_tempos() {
        assert_eq!(classify_single(18.0, 100.0), QUARTER);
        // 12% of a 56ms beat is under 7ms; the 20ms floor keeps this a quarter
        assert_eq!(classify_single(13.5, 56.0), QUARTER);
        // 9% of an 80ms beat is 7.2ms; the 15ms floor lets this reach the "and"
        assert_eq!(classify_single(26.0, 80.0), EIGHTH);
    }

    #[test]
    fn test_fast_intervals_get_the_wider_tolerance() {
        // Average interval is under a sixteenth, so 25% of the 125ms spacing
        // absorbs the 25ms early second stroke
        let result = detect_subdivisions(&[0.0, 100.0, 225.0, 350.0], 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions, vec![16; 4]);
        assert!(result.detected);
    }

    #[test]
    fn test_slow_intervals_get_the_narrow_tolerance() {
        // Eighths 40ms late: within 25% of 250ms but outside 15%
        let result = detect_subdivisions(&[0.0, 290.0], 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions[0], 4);
        assert!(!result.detected);
    }

    #[test]
    fn test_clock_timestamps_past_the_bar() {
        let onsets = [1.7e12, 1.7e12 + 250.0];
        let result = detect_subdivisions(&onsets, 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions, vec![16; 4]);
        assert!(!result.detected);
    }

    #[test]
    fn test_single_onset_tie_breaks() {
        let beat = 500.0;
        assert_eq!(classify_single(10.0, beat), QUARTER);
        assert_eq!(classify_single(240.0, beat), EIGHTH);
        // Slightly late and nowhere near the "and"
        assert_eq!(classify_single(110.0, beat), QUARTER);
        // Between the sixteenth and the "and": within 30% of the half beat
        assert_eq!(classify_single(180.0, beat), EIGHTH);
        // Near the end of the beat reads as an early next downbeat
        assert_eq!(classify_single(480.0, beat), QUARTER);
    }

    #[test]
    fn test_sequence_repeats_to_fill_the_bar() {
        // Only beat 0 played: result is still one entry per beat
        let onsets = [0.0, 125.0, 250.0];
        let result = detect_subdivisions(&onsets, 120.0, TimeSignature::new(5, 4)).unwrap();
        assert_eq!(result.subdivisions, vec![16; 5]);
    }

    #[test]
    fn test_longer_takes_are_trimmed() {
        let onsets: Vec<f64> = (0..16).map(|i| i as f64 * 250.0).collect();
        let result = detect_subdivisions(&onsets, 120.0, TimeSignature::new(3, 4)).unwrap();
        assert_eq!(result.subdivisions, vec![8, 8, 8]);
    }

    #[test]
    fn test_unfittable_beat_is_not_detected() {
        // 40ms then 300ms: no single grid holds both intervals
        let result = detect_subdivisions(&[0.0, 40.0, 340.0], 120.0, four_four()).unwrap();
        assert_eq!(result.subdivisions[0], 4);
        assert!(!result.detected);
    }

    #[test]
    fn test_eighth_based_meter_spacing() {
        // 7/8 at 240 bpm counting eighths: 250ms per eighth, sixteenths 125ms apart
        let onsets = [0.0, 125.0];
        let result = detect_subdivisions(&onsets, 240.0, TimeSignature::new(7, 8)).unwrap();
        assert_eq!(result.subdivisions.len(), 7);
        assert_eq!(result.subdivisions[0], 16);
    }
}
