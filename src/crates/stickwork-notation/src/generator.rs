//! Seeded pattern generation
//!
//! The same settings and seed always produce the same pattern.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use stickwork_core::{Limb, Result, TimeSignature, VoiceId};

use crate::codec::{build_accent_indices, build_phrase_from_accents};
use crate::euclid::euclidean_accents;
use crate::pattern::Pattern;
use crate::token::{NoteToken, Sticking};

const GROUP_SIZES: [usize; 3] = [2, 3, 4];

/// How accents are placed in the bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccentStrategy {
    /// `pulses` accents spread evenly, shifted left by `rotation` notes
    Euclidean { pulses: usize, rotation: usize },
    /// Random groups of two, three and four notes
    RandomGroups,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub time_signature: TimeSignature,
    pub subdivision: u32,
    pub accents: AccentStrategy,
    /// Chance that an unaccented note is a ghosted snare instead of a hi-hat
    pub ghost_probability: f64,
    /// Chance that an accent gets a flam from the other hand
    pub ornament_probability: f64,
    pub left_foot: bool,
    /// Put the kick under the first note of the bar
    pub right_foot: bool,
    pub repeat: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        GeneratorSettings {
            time_signature: TimeSignature::default(),
            subdivision: 16,
            accents: AccentStrategy::RandomGroups,
            ghost_probability: 0.0,
            ornament_probability: 0.0,
            left_foot: false,
            right_foot: false,
            repeat: 1,
        }
    }
}

pub struct PatternGenerator {
    settings: GeneratorSettings,
    rng: StdRng,
}

impl PatternGenerator {
    pub fn new(settings: GeneratorSettings, seed: u64) -> Self {
        PatternGenerator {
            settings,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generate the next pattern. Successive calls continue the same random stream.
    pub fn generate(&mut self) -> Result<Pattern> {
        let settings = self.settings.clone();
        let base = Pattern::new(settings.time_signature, settings.subdivision);
        let notes = base.notes_per_bar()?;

        let phrase = match settings.accents {
            AccentStrategy::Euclidean { pulses, rotation } => {
                build_phrase_from_accents(&euclidean_accents(pulses, notes, rotation), notes)?
            }
            AccentStrategy::RandomGroups => self.random_groups(notes),
        };
        let accents = build_accent_indices(&phrase);

        let ghost = probability(settings.ghost_probability);
        let ornament = probability(settings.ornament_probability);

        let mut voices = Vec::with_capacity(notes);
        let mut sticking = Vec::with_capacity(notes);
        let mut hand = Limb::RightHand;
        for index in 0..notes {
            let accented = accents.contains(&index);
            if accented {
                hand = Limb::RightHand;
            }

            let mut voice = if accented {
                NoteToken::single(VoiceId::Snare)
            } else if self.rng.gen_bool(ghost) {
                NoteToken::single(VoiceId::Snare).ghosted()
            } else {
                NoteToken::single(VoiceId::HiHat)
            };
            if index == 0 && settings.right_foot {
                voice = NoteToken::combined(voice.voices.iter().copied().chain([VoiceId::Kick]));
            }

            let mut stroke = Sticking::hand(hand);
            if accented && self.rng.gen_bool(ornament) {
                stroke.ornament = Some(match hand {
                    Limb::RightHand => 'l',
                    _ => 'r',
                });
            }

            voices.push(voice);
            sticking.push(stroke);
            hand = match hand {
                Limb::RightHand => Limb::LeftHand,
                _ => Limb::RightHand,
            };
        }

        log::debug!(
            "generated {} notes in {} with phrase {:?}",
            notes,
            settings.time_signature,
            phrase
        );

        Ok(base
            .with_phrase(phrase)
            .with_voices(voices)
            .with_sticking(sticking)
            .with_repeat(settings.repeat.max(1))
            .with_feet(settings.left_foot, settings.right_foot))
    }

    /// Groups of 2-4 notes filling `notes`, never leaving a single-note group
    /// unless the bar itself is that short.
    fn random_groups(&mut self, notes: usize) -> Vec<usize> {
        let mut groups = Vec::new();
        let mut remaining = notes;
        while remaining > 0 {
            if remaining <= GROUP_SIZES[GROUP_SIZES.len() - 1] {
                groups.push(remaining);
                break;
            }
            let choices: Vec<usize> = GROUP_SIZES
                .iter()
                .copied()
                .filter(|&size| remaining - size != 1)
                .collect();
            let size = choices.choose(&mut self.rng).copied().unwrap_or(GROUP_SIZES[0]);
            groups.push(size);
            remaining -= size;
        }
        groups
    }
}

fn probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
