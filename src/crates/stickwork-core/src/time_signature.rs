//! Time signatures and the note grid they imply
//!
//! A grid is either uniform (one subdivision for the whole bar) or per-beat
//! (each beat picks its own subdivision). Subdivisions are expressed the way
//! drummers name them: 4 = quarters, 8 = eighths, 12 = eighth triplets,
//! 16 = sixteenths and so on, always relative to a whole note.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TimingError};

static TIME_SIGNATURE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    /// Both parts are clamped to at least 1
    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Parse `"num/den"`. Anything that does not match falls back to 4/4.
    ///
    /// # Examples
    /// ```
    /// use stickwork_core::TimeSignature;
    ///
    /// assert_eq!(TimeSignature::parse("7/8"), TimeSignature::new(7, 8));
    /// assert_eq!(TimeSignature::parse("waltz"), TimeSignature::new(4, 4));
    /// assert_eq!(TimeSignature::parse("0/4"), TimeSignature::new(1, 4));
    /// ```
    pub fn parse(input: &str) -> Self {
        let Some(caps) = TIME_SIGNATURE_RE.as_ref().and_then(|re| re.captures(input)) else {
            return TimeSignature::default();
        };
        match (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            (Ok(num), Ok(den)) => TimeSignature::new(num, den),
            _ => TimeSignature::default(),
        }
    }

    /// Number of counted beats in a bar
    pub fn beats_per_bar(&self) -> u32 {
        self.numerator
    }

    pub fn notes_per_bar(&self, subdivision: u32) -> Result<usize> {
        notes_per_bar(*self, subdivision)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// `numerator × subdivision / denominator`, rounded to the nearest integer
///
/// # Examples
/// ```
/// use stickwork_core::{notes_per_bar, TimeSignature};
///
/// assert_eq!(notes_per_bar(TimeSignature::parse("4/4"), 16).unwrap(), 16);
/// assert_eq!(notes_per_bar(TimeSignature::parse("7/8"), 16).unwrap(), 14);
/// assert_eq!(notes_per_bar(TimeSignature::parse("3/4"), 8).unwrap(), 6);
/// ```
pub fn notes_per_bar(ts: TimeSignature, subdivision: u32) -> Result<usize> {
    if subdivision == 0 {
        return Err(TimingError::zero("subdivision"));
    }
    let notes = ts.numerator as f64 * (subdivision as f64 / ts.denominator as f64);
    Ok(notes.round() as usize)
}

/// Notes contributed by one beat: `subdivision / denominator`, at least one
pub fn notes_per_beat(ts: TimeSignature, subdivision: u32) -> Result<usize> {
    if subdivision == 0 {
        return Err(TimingError::zero("subdivision"));
    }
    let notes = (subdivision as f64 / ts.denominator as f64).round().max(1.0);
    Ok(notes as usize)
}

/// Fit a per-beat subdivision list to the meter: repeat it when short, trim it when long.
pub fn fit_to_beats(subdivisions: &[u32], beats: usize) -> Vec<u32> {
    if subdivisions.is_empty() {
        return Vec::new();
    }
    subdivisions.iter().copied().cycle().take(beats).collect()
}

/// Note layout of one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grid {
    /// Every note has the same length
    Uniform { notes: usize, step_beats: f64 },
    /// Beat `i` is split into `notes_per_beat[i]` equal notes
    PerBeat { notes_per_beat: Vec<usize> },
}

impl Grid {
    pub fn uniform(ts: TimeSignature, subdivision: u32) -> Result<Self> {
        let notes = notes_per_bar(ts, subdivision)?;
        Ok(Grid::Uniform {
            notes,
            step_beats: ts.denominator as f64 / subdivision as f64,
        })
    }

    /// Build a per-beat grid. The list is repeated or trimmed to the beat count.
    pub fn per_beat(ts: TimeSignature, subdivisions: &[u32]) -> Result<Self> {
        if subdivisions.is_empty() {
            return Err(TimingError::EmptySubdivisions);
        }
        let fitted = fit_to_beats(subdivisions, ts.beats_per_bar() as usize);
        let notes_per_beat = fitted
            .iter()
            .map(|&sub| notes_per_beat(ts, sub))
            .collect::<Result<Vec<_>>>()?;
        Ok(Grid::PerBeat { notes_per_beat })
    }

    /// Per-beat when a per-beat list is given, uniform otherwise
    pub fn for_pattern(
        ts: TimeSignature,
        subdivision: u32,
        per_beat: Option<&[u32]>,
    ) -> Result<Self> {
        match per_beat {
            Some(subs) if !subs.is_empty() => Grid::per_beat(ts, subs),
            _ => Grid::uniform(ts, subdivision),
        }
    }

    pub fn notes_per_bar(&self) -> usize {
        match self {
            Grid::Uniform { notes, .. } => *notes,
            Grid::PerBeat { notes_per_beat } => notes_per_beat.iter().sum(),
        }
    }

    /// Beat position of every note in the bar
    ///
    /// # Examples
    /// ```
    /// use stickwork_core::{Grid, TimeSignature};
    ///
    /// let grid = Grid::per_beat(TimeSignature::new(2, 4), &[8, 12]).unwrap();
    /// let positions = grid.positions();
    /// assert_eq!(positions.len(), 5);
    /// assert_eq!(positions[1], 0.5);
    /// assert!((positions[3] - 4.0 / 3.0).abs() < 1e-9);
    /// ```
    pub fn positions(&self) -> Vec<f64> {
        match self {
            Grid::Uniform { notes, step_beats } => {
                (0..*notes).map(|i| i as f64 * step_beats).collect()
            }
            Grid::PerBeat { notes_per_beat } => notes_per_beat
                .iter()
                .enumerate()
                .flat_map(|(beat, &n)| {
                    (0..n).map(move |k| beat as f64 + k as f64 / n as f64)
                })
                .collect(),
        }
    }

    /// Length in beats of each note, in bar order
    pub fn step_beats(&self) -> Vec<f64> {
        match self {
            Grid::Uniform { notes, step_beats } => vec![*step_beats; *notes],
            Grid::PerBeat { notes_per_beat } => notes_per_beat
                .iter()
                .flat_map(|&n| std::iter::repeat(1.0 / n as f64).take(n))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(TIME_SIGNATURE_RE.is_some());
        assert_eq!(TimeSignature::parse("4/4"), TimeSignature::new(4, 4));
        assert_eq!(TimeSignature::parse(" 12 / 8 "), TimeSignature::new(12, 8));
    }

    #[test]
    fn test_parse_malformed_defaults_to_common_time() {
        assert_eq!(TimeSignature::parse(""), TimeSignature::default());
        assert_eq!(TimeSignature::parse("4-4"), TimeSignature::default());
        assert_eq!(TimeSignature::parse("-3/4"), TimeSignature::default());
        assert_eq!(TimeSignature::parse("99999999999/4"), TimeSignature::default());
    }

    #[test]
    fn test_parse_clamps_zero() {
        assert_eq!(TimeSignature::parse("5/0"), TimeSignature::new(5, 1));
        assert_eq!(TimeSignature::new(0, 0), TimeSignature::new(1, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeSignature::new(7, 8).to_string(), "7/8");
    }

    #[test]
    fn test_notes_per_bar() {
        assert_eq!(notes_per_bar(TimeSignature::parse("4/4"), 16), Ok(16));
        assert_eq!(notes_per_bar(TimeSignature::parse("7/8"), 16), Ok(14));
        assert_eq!(notes_per_bar(TimeSignature::parse("3/4"), 8), Ok(6));
        assert_eq!(notes_per_bar(TimeSignature::parse("6/8"), 12), Ok(9));
        assert!(notes_per_bar(TimeSignature::default(), 0).is_err());
    }

    #[test]
    fn test_per_beat_grid() {
        let grid = Grid::per_beat(TimeSignature::new(4, 4), &[16, 12, 8, 4]).unwrap();
        assert_eq!(
            grid,
            Grid::PerBeat {
                notes_per_beat: vec![4, 3, 2, 1]
            }
        );
        assert_eq!(grid.notes_per_bar(), 10);
    }

    #[test]
    fn test_per_beat_grid_repeats_short_lists() {
        let grid = Grid::per_beat(TimeSignature::new(3, 4), &[8]).unwrap();
        assert_eq!(grid.notes_per_bar(), 6);

        let trimmed = Grid::per_beat(TimeSignature::new(2, 4), &[16, 8, 32]).unwrap();
        assert_eq!(trimmed.notes_per_bar(), 6);
    }

    #[test]
    fn test_per_beat_grid_rejects_bad_input() {
        assert_eq!(
            Grid::per_beat(TimeSignature::default(), &[]),
            Err(TimingError::EmptySubdivisions)
        );
        assert!(Grid::per_beat(TimeSignature::default(), &[16, 0]).is_err());
    }

    #[test]
    fn test_uniform_positions() {
        let grid = Grid::uniform(TimeSignature::new(7, 8), 16).unwrap();
        let positions = grid.positions();
        assert_eq!(positions.len(), 14);
        assert_eq!(positions[1], 0.5);
        assert_eq!(positions[13], 6.5);
    }

    #[test]
    fn test_step_beats_sum_to_bar() {
        let grid = Grid::per_beat(TimeSignature::new(3, 4), &[12, 16, 8]).unwrap();
        let total: f64 = grid.step_beats().iter().sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_for_pattern() {
        let ts = TimeSignature::default();
        assert_eq!(Grid::for_pattern(ts, 8, None).unwrap().notes_per_bar(), 8);
        assert_eq!(
            Grid::for_pattern(ts, 8, Some(&[16, 16, 8, 8])).unwrap().notes_per_bar(),
            12
        );
        assert_eq!(Grid::for_pattern(ts, 8, Some(&[])).unwrap().notes_per_bar(), 8);
    }
}
