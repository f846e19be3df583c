use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use stickwork_core::{DrumKit, TimeSignature, VoiceId, VoiceMapper};
use stickwork_midi::{convert, export_patterns, ConvertOptions, MidiRecording};
use stickwork_notation::formatter::format_notes;
use stickwork_notation::{Pattern, PatternText};

#[derive(Parser)]
#[command(name = "stickwork-midi")]
#[command(about = "Convert drum MIDI files to pattern notation and back", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe a MIDI drum recording into per-measure notation
    Convert {
        /// Path to the MIDI file
        midi: PathBuf,

        #[arg(short, long, default_value = "4/4")]
        time_signature: String,

        /// Tempo override (default: the file's first tempo)
        #[arg(short, long)]
        bpm: Option<f64>,

        /// Velocities below this become ghost notes
        #[arg(short, long)]
        ghost_velocity: Option<u8>,

        /// Extra note mappings, e.g. --map 27=S --map 82=H
        #[arg(short, long = "map")]
        mappings: Vec<String>,

        /// Voice for notes nothing else recognizes
        #[arg(long, default_value = "S")]
        fallback: String,

        /// Print measures as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write patterns to a format 0 MIDI file
    Export {
        /// JSON file with one pattern or a list of patterns (text fields)
        patterns: PathBuf,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value = "120")]
        bpm: f64,

        /// JSON file mapping voices to note numbers, e.g. {"kick": 35}
        #[arg(short, long)]
        kit: Option<PathBuf>,
    },
}

fn parse_mapping(text: &str) -> Result<(u8, VoiceId)> {
    let Some((note, voice)) = text.split_once('=') else {
        bail!("Invalid mapping '{}', expected NOTE=VOICE", text);
    };
    let note: u8 = note
        .trim()
        .parse()
        .with_context(|| format!("Invalid note number in '{}'", text))?;
    let Some(voice) = VoiceId::from_symbol(voice.trim()) else {
        bail!("Unknown voice in '{}'", text);
    };
    Ok((note, voice))
}

fn load_patterns(path: &PathBuf) -> Result<Vec<Pattern>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read patterns: {}", path.display()))?;
    let texts: Vec<PatternText> = match serde_json::from_str::<Vec<PatternText>>(&json) {
        Ok(list) => list,
        Err(_) => vec![serde_json::from_str(&json)
            .with_context(|| format!("Invalid pattern JSON in {}", path.display()))?],
    };

    let mut patterns = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        for issue in text.validate() {
            log::warn!("pattern {}: {}", i + 1, issue);
        }
        patterns.push(text.parse());
    }
    Ok(patterns)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            midi,
            time_signature,
            bpm,
            ghost_velocity,
            mappings,
            fallback,
            json,
        } => {
            if !midi.exists() {
                bail!("MIDI file not found: {}", midi.display());
            }
            let recording = MidiRecording::from_file(&midi)
                .with_context(|| format!("Failed to load {}", midi.display()))?;

            let Some(fallback) = VoiceId::from_symbol(&fallback) else {
                bail!("Unknown fallback voice '{}'", fallback);
            };
            let mut mapper = VoiceMapper::new().with_fallback(fallback);
            for text in &mappings {
                let (note, voice) = parse_mapping(text)?;
                mapper = mapper.with_custom(note, voice);
            }

            let ts = TimeSignature::parse(&time_signature);
            let options = ConvertOptions {
                time_signature: ts,
                ghost_velocity,
                mapper,
                ..ConvertOptions::default()
            };
            let bpm = bpm.unwrap_or(recording.bpm);
            let measures = convert(&recording.notes, bpm, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&measures)?);
            } else {
                eprintln!(
                    "{} notes, {} measures at {:.1} bpm",
                    recording.notes.len(),
                    measures.len(),
                    bpm
                );
                for measure in &measures {
                    let phrase: Vec<String> =
                        measure.phrase.iter().map(|n| n.to_string()).collect();
                    println!(
                        "{:>4} | {} | {}{}",
                        measure.index + 1,
                        phrase.join(" "),
                        format_notes(&measure.voices),
                        if measure.detected { "" } else { "  (?)" }
                    );
                }
            }
            Ok(())
        }
        Commands::Export {
            patterns,
            output,
            bpm,
            kit,
        } => {
            let patterns = load_patterns(&patterns)?;
            let kit = match kit {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read kit: {}", path.display()))?;
                    let overrides: DrumKit = serde_json::from_str(&json)
                        .with_context(|| format!("Invalid kit JSON in {}", path.display()))?;
                    DrumKit::default().merged(&overrides)
                }
                None => DrumKit::default(),
            };

            let bytes = export_patterns(&patterns, bpm, &kit)?;
            fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("✓ Wrote {} patterns to {}", patterns.len(), output.display());
            Ok(())
        }
    }
}
