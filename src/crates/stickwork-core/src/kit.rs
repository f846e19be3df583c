//! Drum voices, limbs, and the General MIDI tables that connect them to note numbers
//!
//! Based on the GM Level 1 Percussion Key Map (channel 10). The tables are
//! plain values ([`DrumKit`], [`VoiceMapper`]) handed to whoever needs them, so
//! an alternate kit is just a different value.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A sound on the kit.
///
/// Declaration order is the canonical order used when several voices share one
/// grid cell (kick, snare, hi-hat, tom, floor, open hi-hat, then cymbals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceId {
    Kick,
    Snare,
    HiHat,
    Tom,
    Floor,
    OpenHiHat,
    Ride,
    Crash,
}

impl VoiceId {
    pub const ALL: [VoiceId; 8] = [
        VoiceId::Kick,
        VoiceId::Snare,
        VoiceId::HiHat,
        VoiceId::Tom,
        VoiceId::Floor,
        VoiceId::OpenHiHat,
        VoiceId::Ride,
        VoiceId::Crash,
    ];

    /// Symbol used in voice tokens
    pub fn symbol(&self) -> &'static str {
        match self {
            VoiceId::Kick => "K",
            VoiceId::Snare => "S",
            VoiceId::HiHat => "H",
            VoiceId::Tom => "T",
            VoiceId::Floor => "F",
            VoiceId::OpenHiHat => "O",
            VoiceId::Ride => "R",
            VoiceId::Crash => "C",
        }
    }

    /// Parse a voice symbol, accepting a few common long forms
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_uppercase().as_str() {
            "K" | "B" | "BD" | "KICK" => Some(VoiceId::Kick),
            "S" | "SD" | "SNARE" => Some(VoiceId::Snare),
            "H" | "HH" | "HAT" | "HIHAT" => Some(VoiceId::HiHat),
            "T" | "TOM" | "HT" | "MT" => Some(VoiceId::Tom),
            "F" | "FT" | "FLOOR" | "LT" => Some(VoiceId::Floor),
            "O" | "OH" => Some(VoiceId::OpenHiHat),
            "R" | "RD" | "RIDE" => Some(VoiceId::Ride),
            "C" | "CR" | "CRASH" => Some(VoiceId::Crash),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoiceId::Kick => "kick",
            VoiceId::Snare => "snare",
            VoiceId::HiHat => "hi-hat",
            VoiceId::Tom => "tom",
            VoiceId::Floor => "floor tom",
            VoiceId::OpenHiHat => "open hi-hat",
            VoiceId::Ride => "ride",
            VoiceId::Crash => "crash",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which limb plays a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    RightHand,
    LeftHand,
    RightFoot,
    LeftFoot,
}

impl Limb {
    pub fn symbol(&self) -> &'static str {
        match self {
            Limb::RightHand => "R",
            Limb::LeftHand => "L",
            Limb::RightFoot => "RF",
            Limb::LeftFoot => "LF",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_uppercase().as_str() {
            "R" => Some(Limb::RightHand),
            "L" => Some(Limb::LeftHand),
            "RF" | "K" => Some(Limb::RightFoot),
            "LF" => Some(Limb::LeftFoot),
            _ => None,
        }
    }
}

/// Convert a GM drum note number to a kit voice
pub fn gm_drum_to_voice(note_num: u8) -> Option<VoiceId> {
    match note_num {
        // Bass Drums
        35 | 36 => Some(VoiceId::Kick),

        // Snares, side stick and clap all read as snare-hand notes
        37 | 38 | 39 | 40 => Some(VoiceId::Snare),

        // Floor toms
        41 | 43 => Some(VoiceId::Floor),

        // Rack toms
        45 | 47 | 48 | 50 => Some(VoiceId::Tom),

        // Hi-Hats (closed and pedal)
        42 | 44 => Some(VoiceId::HiHat),
        46 => Some(VoiceId::OpenHiHat),

        // Crash, china and splash
        49 | 52 | 55 | 57 => Some(VoiceId::Crash),

        // Ride and bell
        51 | 53 | 59 => Some(VoiceId::Ride),

        _ => None,
    }
}

/// Coarse guess for notes outside the GM kit table, by note range
pub fn heuristic_voice(note_num: u8) -> Option<VoiceId> {
    match note_num {
        0..=36 => Some(VoiceId::Kick),
        37..=40 => Some(VoiceId::Snare),
        41..=44 => Some(VoiceId::Floor),
        45..=50 => Some(VoiceId::Tom),
        51..=59 => Some(VoiceId::Ride),
        // Bongos, congas and timbales
        60..=69 => Some(VoiceId::Tom),
        // Shakers, whistles, blocks and triangles
        70..=81 => Some(VoiceId::HiHat),
        _ => None,
    }
}

/// Get the human-readable name for a GM drum note
pub fn gm_drum_name(note_num: u8) -> &'static str {
    match note_num {
        35 => "Acoustic Bass Drum",
        36 => "Bass Drum 1",
        37 => "Side Stick",
        38 => "Acoustic Snare",
        39 => "Hand Clap",
        40 => "Electric Snare",
        41 => "Low Floor Tom",
        42 => "Closed Hi-Hat",
        43 => "High Floor Tom",
        44 => "Pedal Hi-Hat",
        45 => "Low Tom",
        46 => "Open Hi-Hat",
        47 => "Low-Mid Tom",
        48 => "Hi-Mid Tom",
        49 => "Crash Cymbal 1",
        50 => "High Tom",
        51 => "Ride Cymbal 1",
        52 => "Chinese Cymbal",
        53 => "Ride Bell",
        54 => "Tambourine",
        55 => "Splash Cymbal",
        56 => "Cowbell",
        57 => "Crash Cymbal 2",
        58 => "Vibraslap",
        59 => "Ride Cymbal 2",
        _ => "Unknown Drum",
    }
}

/// Voice to GM note number table used for playback, export and practice.
///
/// Serializes as a plain `{ "kick": 36, ... }` map so a user config can
/// override single entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrumKit {
    notes: BTreeMap<VoiceId, u8>,
}

impl Default for DrumKit {
    fn default() -> Self {
        let notes = BTreeMap::from([
            (VoiceId::Kick, 36),
            (VoiceId::Snare, 38),
            (VoiceId::HiHat, 42),
            (VoiceId::Tom, 48),
            (VoiceId::Floor, 43),
            (VoiceId::OpenHiHat, 46),
            (VoiceId::Ride, 51),
            (VoiceId::Crash, 49),
        ]);
        DrumKit { notes }
    }
}

impl DrumKit {
    /// A kit with no voices; build it up with [`DrumKit::with_note`]
    pub fn empty() -> Self {
        DrumKit {
            notes: BTreeMap::new(),
        }
    }

    pub fn with_note(mut self, voice: VoiceId, note: u8) -> Self {
        self.notes.insert(voice, note.min(127));
        self
    }

    pub fn without(mut self, voice: VoiceId) -> Self {
        self.notes.remove(&voice);
        self
    }

    /// Note number for a voice, `None` when the kit lacks it
    pub fn note_for(&self, voice: VoiceId) -> Option<u8> {
        self.notes.get(&voice).copied()
    }

    /// Reverse lookup of a kit note; the first voice in canonical order wins
    pub fn voice_for(&self, note: u8) -> Option<VoiceId> {
        self.notes
            .iter()
            .find(|(_, &n)| n == note)
            .map(|(&voice, _)| voice)
    }

    /// Overlay another kit's entries on top of this one
    pub fn merged(mut self, overrides: &DrumKit) -> Self {
        for (&voice, &note) in &overrides.notes {
            self.notes.insert(voice, note);
        }
        self
    }

    pub fn voices(&self) -> impl Iterator<Item = VoiceId> + '_ {
        self.notes.keys().copied()
    }
}

/// How a note number was resolved to a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    Custom,
    Default,
    Heuristic,
    Fallback,
}

/// Note number to voice lookup for incoming MIDI.
///
/// Resolution order: custom table, then the GM default table, then the
/// note-range heuristic, then the fallback voice. Every note maps to some
/// voice; nothing is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMapper {
    custom: HashMap<u8, VoiceId>,
    use_default_table: bool,
    use_heuristic: bool,
    fallback: VoiceId,
}

impl Default for VoiceMapper {
    fn default() -> Self {
        VoiceMapper {
            custom: HashMap::new(),
            use_default_table: true,
            use_heuristic: true,
            fallback: VoiceId::Snare,
        }
    }
}

impl VoiceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper whose custom table is the reverse of a kit
    pub fn from_kit(kit: &DrumKit) -> Self {
        let mut mapper = Self::default();
        // Reverse canonical order so the earliest voice wins a shared note
        for voice in kit.voices().collect::<Vec<_>>().into_iter().rev() {
            if let Some(note) = kit.note_for(voice) {
                mapper.custom.insert(note, voice);
            }
        }
        mapper
    }

    pub fn with_custom(mut self, note: u8, voice: VoiceId) -> Self {
        self.custom.insert(note, voice);
        self
    }

    pub fn with_fallback(mut self, voice: VoiceId) -> Self {
        self.fallback = voice;
        self
    }

    pub fn without_default_table(mut self) -> Self {
        self.use_default_table = false;
        self
    }

    pub fn without_heuristic(mut self) -> Self {
        self.use_heuristic = false;
        self
    }

    pub fn fallback(&self) -> VoiceId {
        self.fallback
    }

    /// Resolve a note and report where the answer came from
    pub fn resolve(&self, note: u8) -> (VoiceId, MappingSource) {
        if let Some(&voice) = self.custom.get(&note) {
            return (voice, MappingSource::Custom);
        }
        if self.use_default_table {
            if let Some(voice) = gm_drum_to_voice(note) {
                return (voice, MappingSource::Default);
            }
        }
        if self.use_heuristic {
            if let Some(voice) = heuristic_voice(note) {
                return (voice, MappingSource::Heuristic);
            }
        }
        (self.fallback, MappingSource::Fallback)
    }

    /// Resolve a note, logging anything that needed a guess
    pub fn map(&self, note: u8) -> VoiceId {
        let (voice, source) = self.resolve(note);
        match source {
            MappingSource::Heuristic => log::debug!(
                "note {} ({}) not in drum table, guessed {}",
                note,
                gm_drum_name(note),
                voice.name()
            ),
            MappingSource::Fallback => log::warn!(
                "unknown drum note {}, defaulting to {}",
                note,
                voice.name()
            ),
            _ => {}
        }
        voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_drums() {
        assert_eq!(gm_drum_to_voice(36), Some(VoiceId::Kick));
        assert_eq!(gm_drum_to_voice(38), Some(VoiceId::Snare));
        assert_eq!(gm_drum_to_voice(42), Some(VoiceId::HiHat));
        assert_eq!(gm_drum_to_voice(46), Some(VoiceId::OpenHiHat));
        assert_eq!(gm_drum_to_voice(49), Some(VoiceId::Crash));
        assert_eq!(gm_drum_to_voice(60), None);
    }

    #[test]
    fn test_drum_names() {
        assert_eq!(gm_drum_name(36), "Bass Drum 1");
        assert_eq!(gm_drum_name(38), "Acoustic Snare");
        assert_eq!(gm_drum_name(42), "Closed Hi-Hat");
        assert_eq!(gm_drum_name(12), "Unknown Drum");
    }

    #[test]
    fn test_symbols_round_trip() {
        for voice in VoiceId::ALL {
            assert_eq!(VoiceId::from_symbol(voice.symbol()), Some(voice));
        }
        assert_eq!(VoiceId::from_symbol("hh"), Some(VoiceId::HiHat));
        assert_eq!(VoiceId::from_symbol("X"), None);
    }

    #[test]
    fn test_canonical_order() {
        let mut voices = vec![VoiceId::OpenHiHat, VoiceId::Snare, VoiceId::Floor, VoiceId::Kick];
        voices.sort();
        assert_eq!(
            voices,
            vec![VoiceId::Kick, VoiceId::Snare, VoiceId::Floor, VoiceId::OpenHiHat]
        );
        assert!(VoiceId::HiHat < VoiceId::Tom);
    }

    #[test]
    fn test_mapper_resolution_order() {
        let mapper = VoiceMapper::new().with_custom(38, VoiceId::Tom);
        assert_eq!(mapper.resolve(38), (VoiceId::Tom, MappingSource::Custom));
        assert_eq!(mapper.resolve(36), (VoiceId::Kick, MappingSource::Default));
        assert_eq!(mapper.resolve(62), (VoiceId::Tom, MappingSource::Heuristic));
        assert_eq!(mapper.resolve(120), (VoiceId::Snare, MappingSource::Fallback));
    }

    #[test]
    fn test_mapper_without_tables_falls_back() {
        let mapper = VoiceMapper::new()
            .without_default_table()
            .without_heuristic()
            .with_fallback(VoiceId::HiHat);
        assert_eq!(mapper.map(36), VoiceId::HiHat);
    }

    #[test]
    fn test_kit_lookup_and_overrides() {
        let kit = DrumKit::default();
        assert_eq!(kit.note_for(VoiceId::Snare), Some(38));
        assert_eq!(kit.voice_for(42), Some(VoiceId::HiHat));

        let custom = kit.clone().merged(&DrumKit::empty().with_note(VoiceId::Snare, 40));
        assert_eq!(custom.note_for(VoiceId::Snare), Some(40));
        assert_eq!(custom.note_for(VoiceId::Kick), Some(36));

        let no_ride = kit.without(VoiceId::Ride);
        assert_eq!(no_ride.note_for(VoiceId::Ride), None);
    }

    #[test]
    fn test_mapper_from_kit() {
        let kit = DrumKit::empty().with_note(VoiceId::Kick, 24).with_note(VoiceId::Snare, 26);
        let mapper = VoiceMapper::from_kit(&kit);
        assert_eq!(mapper.resolve(24), (VoiceId::Kick, MappingSource::Custom));
        assert_eq!(mapper.resolve(26), (VoiceId::Snare, MappingSource::Custom));
    }

    #[test]
    fn test_limb_symbols() {
        assert_eq!(Limb::from_symbol("r"), Some(Limb::RightHand));
        assert_eq!(Limb::from_symbol("K"), Some(Limb::RightFoot));
        assert_eq!(Limb::from_symbol("LF"), Some(Limb::LeftFoot));
        assert_eq!(Limb::from_symbol("x"), None);
    }

    #[test]
    fn test_kit_serializes_as_map() {
        let kit = DrumKit::empty().with_note(VoiceId::Kick, 36);
        let json = serde_json::to_string(&kit).unwrap();
        assert_eq!(json, r#"{"kick":36}"#);
    }
}
