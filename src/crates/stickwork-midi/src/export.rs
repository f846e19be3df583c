use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use stickwork_core::{ms_per_beat, DrumKit};
use stickwork_notation::Pattern;

use crate::error::{MidiError, Result};

pub const TICKS_PER_BEAT: u16 = 480;
/// General MIDI percussion, counting channels from zero
pub const DRUM_CHANNEL: u8 = 9;

pub const ACCENT_VELOCITY: u8 = 110;
pub const NORMAL_VELOCITY: u8 = 80;
pub const GHOST_VELOCITY: u8 = 40;

/// Render patterns back to back as a format 0 Standard MIDI File.
///
/// Each pattern is played `repeat` times. Rests, and voices the kit has no
/// note for, take up time but produce no events.
pub fn export_patterns(patterns: &[Pattern], bpm: f64, kit: &DrumKit) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_smf(patterns, bpm, kit, &mut out)?;
    Ok(out)
}

pub fn write_smf(patterns: &[Pattern], bpm: f64, kit: &DrumKit, out: &mut Vec<u8>) -> Result<()> {
    let us_per_beat = (ms_per_beat(bpm)? * 1000.0).round() as u32;

    let mut events = vec![TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_beat.into())),
    }];
    events.extend(note_events(patterns, kit)?);
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(TICKS_PER_BEAT.into()),
        },
        tracks: vec![events],
    };

    smf.write(out)
        .map_err(|e| MidiError::Write(e.to_string()))?;

    Ok(())
}

/// Note-on/off pairs with delta times, note-offs first where they coincide
fn note_events(patterns: &[Pattern], kit: &DrumKit) -> Result<Vec<TrackEvent<'static>>> {
    // (absolute tick, 0 = off / 1 = on, key, velocity)
    let mut timeline: Vec<(u32, u8, u8, u8)> = Vec::new();
    let mut position_beats = 0.0;

    for pattern in patterns {
        let notes = pattern.notes()?;
        let steps = pattern.grid()?.step_beats();
        let accents = pattern.accent_indices()?;

        for _ in 0..pattern.repeat {
            for (index, (note, step)) in notes.iter().zip(&steps).enumerate() {
                let start = to_ticks(position_beats);
                position_beats += step;
                let end = to_ticks(position_beats);

                let velocity = if note.is_ghost {
                    GHOST_VELOCITY
                } else if accents.contains(&index) {
                    ACCENT_VELOCITY
                } else {
                    NORMAL_VELOCITY
                };

                for &voice in &note.voices {
                    let Some(key) = kit.note_for(voice) else {
                        log::warn!("kit has no note for {}, skipping", voice.name());
                        continue;
                    };
                    timeline.push((start, 1, key, velocity));
                    timeline.push((end, 0, key, 0));
                }
            }
        }
    }

    timeline.sort_by_key(|&(tick, is_on, _, _)| (tick, is_on));

    let mut previous = 0;
    Ok(timeline
        .into_iter()
        .map(|(tick, is_on, key, vel)| {
            let delta = tick.saturating_sub(previous);
            previous = tick;
            let message = if is_on == 1 {
                MidiMessage::NoteOn {
                    key: key.into(),
                    vel: vel.into(),
                }
            } else {
                MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                }
            };
            TrackEvent {
                delta: delta.into(),
                kind: TrackEventKind::Midi {
                    channel: DRUM_CHANNEL.into(),
                    message,
                },
            }
        })
        .collect())
}

fn to_ticks(beats: f64) -> u32 {
    (beats * TICKS_PER_BEAT as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickwork_core::TimeSignature;
    use stickwork_notation::PatternText;

    fn rock_beat() -> Pattern {
        PatternText {
            time_signature: "4/4".into(),
            subdivision: 8,
            phrase: "2 2 2 2".into(),
            voices: "K+H H S+H (S) K+H H S+H -".into(),
            sticking: "R".into(),
            ..PatternText::default()
        }
        .parse()
    }

    /// (absolute tick, is note-on, key, velocity) for every channel event
    fn read_back(bytes: &[u8]) -> Vec<(u32, bool, u8, u8)> {
        let smf = Smf::parse(bytes).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(TICKS_PER_BEAT.into()));
        assert_eq!(smf.tracks.len(), 1);

        let mut tick = 0;
        let mut notes = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { channel, message } = event.kind {
                assert_eq!(channel.as_int(), DRUM_CHANNEL);
                match message {
                    MidiMessage::NoteOn { key, vel } => {
                        notes.push((tick, true, key.as_int(), vel.as_int()))
                    }
                    MidiMessage::NoteOff { key, .. } => notes.push((tick, false, key.as_int(), 0)),
                    _ => {}
                }
            }
        }
        notes
    }

    #[test]
    fn test_header_and_tempo() {
        let bytes = export_patterns(&[rock_beat()], 120.0, &DrumKit::default()).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");

        let smf = Smf::parse(&bytes).unwrap();
        let track = &smf.tracks[0];
        assert_eq!(
            track[0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(500_000.into()))
        );
        assert_eq!(
            track[track.len() - 1].kind,
            TrackEventKind::Meta(MetaMessage::EndOfTrack)
        );
    }

    #[test]
    fn test_notes_and_velocities() {
        let bytes = export_patterns(&[rock_beat()], 120.0, &DrumKit::default()).unwrap();
        let ons: Vec<(u32, u8, u8)> = read_back(&bytes)
            .into_iter()
            .filter(|&(_, on, _, _)| on)
            .map(|(tick, _, key, vel)| (tick, key, vel))
            .collect();

        // Accents fall on every other eighth; the kick and hi-hat share tick 0
        assert_eq!(ons[0], (0, 36, ACCENT_VELOCITY));
        assert_eq!(ons[1], (0, 42, ACCENT_VELOCITY));
        assert_eq!(ons[2], (240, 42, NORMAL_VELOCITY));
        assert_eq!(ons[3], (480, 38, ACCENT_VELOCITY));
        assert_eq!(ons[5], (720, 38, GHOST_VELOCITY));
        // Eleven strokes; the final rest produces nothing
        assert_eq!(ons.len(), 11);
    }

    #[test]
    fn test_note_off_precedes_note_on_at_same_tick() {
        let bytes = export_patterns(&[rock_beat()], 120.0, &DrumKit::default()).unwrap();
        let events = read_back(&bytes);
        let at_240: Vec<bool> = events
            .iter()
            .filter(|&&(tick, _, _, _)| tick == 240)
            .map(|&(_, on, _, _)| on)
            .collect();
        assert_eq!(at_240, vec![false, false, true]);
    }

    #[test]
    fn test_repeat_and_concatenation() {
        let first = rock_beat().with_repeat(2);
        let second = Pattern::new(TimeSignature::new(3, 4), 4)
            .with_voices(vec![stickwork_notation::NoteToken::parse("C").unwrap()]);

        let bytes = export_patterns(&[first, second], 90.0, &DrumKit::default()).unwrap();
        let ons: Vec<(u32, bool, u8, u8)> = read_back(&bytes).into_iter().filter(|e| e.1).collect();
        assert_eq!(ons.len(), 11 * 2 + 3);

        // The crash bar starts after two bars of 4/4
        let crashes: Vec<u32> = ons.iter().filter(|e| e.2 == 49).map(|e| e.0).collect();
        assert_eq!(crashes, vec![3840, 4320, 4800]);
    }

    #[test]
    fn test_voices_missing_from_kit_are_skipped() {
        let kit = DrumKit::default().without(stickwork_core::VoiceId::HiHat);
        let bytes = export_patterns(&[rock_beat()], 120.0, &kit).unwrap();
        let ons = read_back(&bytes).into_iter().filter(|e| e.1).count();
        assert_eq!(ons, 5);
    }

    #[test]
    fn test_invalid_tempo() {
        assert!(export_patterns(&[rock_beat()], -5.0, &DrumKit::default()).is_err());
    }
}
