//! Difficulty scoring from structural pattern features
//!
//! The score is a sum of independently capped terms, clamped to `[1, 10]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use stickwork_core::Result;

use crate::pattern::Pattern;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyTier {
    pub fn from_score(score: f64) -> Self {
        if score <= 3.0 {
            DifficultyTier::Beginner
        } else if score <= 6.0 {
            DifficultyTier::Intermediate
        } else if score <= 8.0 {
            DifficultyTier::Advanced
        } else {
            DifficultyTier::Expert
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DifficultyTier::Beginner => "beginner",
            DifficultyTier::Intermediate => "intermediate",
            DifficultyTier::Advanced => "advanced",
            DifficultyTier::Expert => "expert",
        };
        f.write_str(name)
    }
}

/// What the scorer looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyFeatures {
    /// Finest subdivision in the bar
    pub subdivision: u32,
    pub numerator: u32,
    pub denominator: u32,
    pub notes_per_beat: f64,
    pub accents: usize,
    pub rests: usize,
    /// Distinct per-beat subdivisions, 0 for a uniform grid
    pub per_beat_variety: usize,
    pub polyrhythm: bool,
    pub ghosts: usize,
    pub ornaments: usize,
}

impl DifficultyFeatures {
    pub fn from_pattern(pattern: &Pattern) -> Result<Self> {
        let notes = pattern.notes()?;
        let ts = pattern.time_signature;

        let (subdivision, per_beat_variety) = match &pattern.per_beat_subdivisions {
            Some(subs) if !subs.is_empty() => {
                let distinct: BTreeSet<u32> = subs.iter().copied().collect();
                let finest = distinct.iter().next_back().copied().unwrap_or(pattern.subdivision);
                (finest, distinct.len())
            }
            _ => (pattern.subdivision, 0),
        };

        Ok(DifficultyFeatures {
            subdivision,
            numerator: ts.numerator,
            denominator: ts.denominator,
            notes_per_beat: notes.len() as f64 / ts.beats_per_bar() as f64,
            accents: pattern.accent_indices()?.len(),
            rests: notes.iter().filter(|n| n.is_rest()).count(),
            per_beat_variety,
            polyrhythm: false,
            ghosts: notes.iter().filter(|n| n.is_ghost).count(),
            ornaments: notes.iter().filter(|n| n.has_ornament_prefix).count(),
        })
    }

    pub fn with_polyrhythm(mut self) -> Self {
        self.polyrhythm = true;
        self
    }
}

/// Score, tier and the contribution of each term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub score: f64,
    pub tier: DifficultyTier,
    pub breakdown: Vec<(String, f64)>,
}

pub fn score(features: &DifficultyFeatures) -> Difficulty {
    let terms = [
        ("subdivision", subdivision_tier(features.subdivision)),
        ("meter", meter_term(features.numerator)),
        ("density", density_term(features.notes_per_beat)),
        ("accents", capped(features.accents, 0.25, 1.5)),
        ("rests", capped(features.rests, 0.1, 0.5)),
        ("per_beat", capped(features.per_beat_variety, 0.5, 2.0)),
        ("polyrhythm", if features.polyrhythm { 2.0 } else { 0.0 }),
        ("ghosts", capped(features.ghosts, 0.25, 1.5)),
        ("ornaments", capped(features.ornaments, 0.5, 2.5)),
    ];

    let total: f64 = terms.iter().map(|(_, v)| v).sum();
    let score = total.clamp(MIN_SCORE, MAX_SCORE);
    Difficulty {
        score,
        tier: DifficultyTier::from_score(score),
        breakdown: terms
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect(),
    }
}

pub fn score_pattern(pattern: &Pattern) -> Result<Difficulty> {
    Ok(score(&DifficultyFeatures::from_pattern(pattern)?))
}

/// 1 for quarters up to 7 for anything finer than 28ths
fn subdivision_tier(subdivision: u32) -> f64 {
    match subdivision {
        0..=4 => 1.0,
        5..=8 => 2.0,
        9..=12 => 3.0,
        13..=16 => 4.0,
        17..=24 => 5.0,
        25..=28 => 6.0,
        _ => 7.0,
    }
}

fn meter_term(numerator: u32) -> f64 {
    if numerator % 2 == 1 {
        1.0
    } else if numerator != 4 {
        0.5
    } else {
        0.0
    }
}

fn density_term(notes_per_beat: f64) -> f64 {
    if notes_per_beat > 4.0 {
        1.0
    } else if notes_per_beat > 2.0 {
        0.5
    } else {
        0.0
    }
}

fn capped(count: usize, weight: f64, cap: f64) -> f64 {
    (count as f64 * weight).min(cap)
}
