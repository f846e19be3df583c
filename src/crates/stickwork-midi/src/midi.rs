use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// 120 BPM
pub const DEFAULT_TEMPO_US: u32 = 500_000;

/// One struck note of a recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiRecordedNote {
    pub time_ms: f64,
    pub note: u8,
    pub velocity: u8,
}

/// Note-ons of a Standard MIDI File, in time order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiRecording {
    /// Tempo of the first tempo event, or 120
    pub bpm: f64,
    pub notes: Vec<MidiRecordedNote>,
}

impl MidiRecording {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Read every note-on with a non-zero velocity, on all tracks and channels.
    ///
    /// Tempo changes anywhere in the file are honored when converting ticks to
    /// milliseconds.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;
        let clock = TickClock::new(&smf);

        let mut notes = Vec::new();
        for track in &smf.tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += event.delta.as_int() as u64;
                if let TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } = event.kind
                {
                    if vel.as_int() > 0 {
                        notes.push(MidiRecordedNote {
                            time_ms: clock.to_ms(tick),
                            note: key.as_int(),
                            velocity: vel.as_int(),
                        });
                    }
                }
            }
        }
        notes.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

        log::debug!("read {} notes at {:.2} bpm", notes.len(), clock.first_bpm());
        Ok(MidiRecording {
            bpm: clock.first_bpm(),
            notes,
        })
    }
}

/// Converts absolute ticks to milliseconds
struct TickClock {
    /// Tempo of the first tempo event in the file
    first_bpm: f64,
    timing: ClockTiming,
}

enum ClockTiming {
    /// Tempo map as (tick, microseconds per beat), starting at tick 0
    Metrical {
        ticks_per_beat: f64,
        tempos: Vec<(u64, u32)>,
    },
    Timecode { ticks_per_second: f64 },
}

impl TickClock {
    fn new(smf: &Smf) -> Self {
        let mut tempos: Vec<(u64, u32)> = Vec::new();
        for track in &smf.tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += event.delta.as_int() as u64;
                if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                    tempos.push((tick, tempo.as_int()));
                }
            }
        }
        tempos.sort_by_key(|&(tick, _)| tick);
        let first_bpm = tempo_to_bpm(tempos.first().map_or(DEFAULT_TEMPO_US, |&(_, t)| t));

        let timing = match smf.header.timing {
            Timing::Metrical(tpb) => {
                if tempos.first().map_or(true, |&(tick, _)| tick > 0) {
                    tempos.insert(0, (0, DEFAULT_TEMPO_US));
                }
                ClockTiming::Metrical {
                    ticks_per_beat: tpb.as_int().max(1) as f64,
                    tempos,
                }
            }
            Timing::Timecode(fps, subframe) => ClockTiming::Timecode {
                ticks_per_second: (fps.as_f32() * subframe as f32).max(1.0) as f64,
            },
        };

        TickClock { first_bpm, timing }
    }

    fn first_bpm(&self) -> f64 {
        self.first_bpm
    }

    fn to_ms(&self, tick: u64) -> f64 {
        match &self.timing {
            ClockTiming::Metrical {
                ticks_per_beat,
                tempos,
            } => {
                let mut ms = 0.0;
                for (i, &(start, tempo)) in tempos.iter().enumerate() {
                    if start >= tick {
                        break;
                    }
                    let end = tempos.get(i + 1).map_or(tick, |&(next, _)| next.min(tick));
                    ms += (end - start) as f64 * tempo as f64 / 1000.0 / ticks_per_beat;
                }
                ms
            }
            ClockTiming::Timecode { ticks_per_second } => tick as f64 * 1000.0 / ticks_per_second,
        }
    }
}

fn tempo_to_bpm(us_per_beat: u32) -> f64 {
    60_000_000.0 / us_per_beat.max(1) as f64
}
