use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use stickwork_core::{Grid, Polyrhythm, PolyrhythmRatio, TimeSignature};
use stickwork_notation::{
    build_accent_indices, build_phrase_from_accents, parse_numeric_list, parse_phrase, score,
    AccentStrategy, DifficultyFeatures, GeneratorSettings, PatternGenerator, PatternText,
};

#[derive(Parser)]
#[command(name = "stickwork")]
#[command(about = "Drum pattern timing, notation and difficulty tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show notes per bar and note positions for a meter
    Grid {
        /// Time signature, e.g. 7/8
        #[arg(short, long, default_value = "4/4")]
        time_signature: String,

        /// Notes per whole note (4 = quarters, 16 = sixteenths)
        #[arg(short, long, default_value = "16")]
        subdivision: u32,

        /// Per-beat subdivisions, e.g. "8 12 16 8"
        #[arg(short, long)]
        per_beat: Option<String>,
    },
    /// Accent indices of a phrase
    Accents {
        /// Group lengths, e.g. "3 3 2"
        phrase: String,
    },
    /// Phrase groups from accent indices
    Phrase {
        /// Accent indices, e.g. "0 3 6"
        accents: String,

        /// Notes in the bar
        #[arg(short, long)]
        notes: usize,
    },
    /// Positions, alignments and tuplets of an N:M polyrhythm
    Poly {
        /// Ratio, e.g. 3:2
        ratio: String,

        #[arg(short, long, default_value = "4/4")]
        time_signature: String,
    },
    /// Score the difficulty of a pattern
    Difficulty {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Count the pattern as part of a polyrhythm exercise
        #[arg(long)]
        polyrhythm: bool,
    },
    /// Generate a pattern from a seed
    Generate {
        #[arg(short, long, default_value = "4/4")]
        time_signature: String,

        #[arg(short, long, default_value = "16")]
        subdivision: u32,

        /// Euclidean accent count; random 2/3/4 groups when omitted
        #[arg(short, long)]
        euclid: Option<usize>,

        /// Rotation of the Euclidean accents
        #[arg(long, default_value = "0")]
        rotation: usize,

        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "0.0")]
        ghosts: f64,

        #[arg(long, default_value = "0.0")]
        ornaments: f64,
    },
    /// Check a pattern for inconsistent fields
    Validate {
        #[command(flatten)]
        pattern: PatternArgs,
    },
}

/// A pattern given either as a JSON file or as text fields
#[derive(Args)]
struct PatternArgs {
    /// JSON file holding the pattern's text fields
    #[arg(short, long, conflicts_with_all = ["phrase", "voices", "sticking"])]
    file: Option<PathBuf>,

    #[arg(short, long, default_value = "4/4")]
    time_signature: String,

    #[arg(short, long, default_value = "16")]
    subdivision: u32,

    #[arg(long, default_value = "")]
    per_beat: String,

    #[arg(long, default_value = "")]
    phrase: String,

    #[arg(long, default_value = "S")]
    voices: String,

    #[arg(long, default_value = "R L")]
    sticking: String,
}

impl PatternArgs {
    fn load(&self) -> Result<PatternText> {
        if let Some(path) = &self.file {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read pattern file: {}", path.display()))?;
            return serde_json::from_str(&json)
                .with_context(|| format!("Invalid pattern JSON in {}", path.display()));
        }
        Ok(PatternText {
            time_signature: self.time_signature.clone(),
            subdivision: self.subdivision,
            per_beat_subdivisions: self.per_beat.clone(),
            phrase: self.phrase.clone(),
            voices: self.voices.clone(),
            sticking: self.sticking.clone(),
            ..PatternText::default()
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Grid {
            time_signature,
            subdivision,
            per_beat,
        } => {
            let ts = TimeSignature::parse(&time_signature);
            let per_beat: Option<Vec<u32>> = per_beat.map(|text| {
                parse_numeric_list(&text)
                    .into_iter()
                    .map(|n| n.round() as u32)
                    .collect()
            });
            let grid = Grid::for_pattern(ts, subdivision, per_beat.as_deref())?;
            println!("{} at 1/{}: {} notes per bar", ts, subdivision, grid.notes_per_bar());
            print_json(&grid.positions())
        }
        Commands::Accents { phrase } => {
            let groups = parse_phrase(&phrase, 0);
            print_json(&build_accent_indices(&groups))
        }
        Commands::Phrase { accents, notes } => {
            let indices: Vec<usize> = accents
                .split_whitespace()
                .filter_map(|t| t.parse().ok())
                .collect();
            print_json(&build_phrase_from_accents(&indices, notes)?)
        }
        Commands::Poly {
            ratio,
            time_signature,
        } => {
            let Some(ratio) = PolyrhythmRatio::parse(&ratio) else {
                bail!("Invalid ratio '{}', expected N:M", ratio);
            };
            let poly = Polyrhythm::new(ratio, TimeSignature::parse(&time_signature))?;
            print_json(&poly)
        }
        Commands::Difficulty {
            pattern,
            polyrhythm,
        } => {
            let pattern = pattern.load()?.parse();
            let mut features = DifficultyFeatures::from_pattern(&pattern)?;
            if polyrhythm {
                features = features.with_polyrhythm();
            }
            let difficulty = score(&features);
            println!("{:.2} ({})", difficulty.score, difficulty.tier);
            for (term, value) in &difficulty.breakdown {
                log::debug!("{}: {}", term, value);
            }
            Ok(())
        }
        Commands::Generate {
            time_signature,
            subdivision,
            euclid,
            rotation,
            seed,
            ghosts,
            ornaments,
        } => {
            let settings = GeneratorSettings {
                time_signature: TimeSignature::parse(&time_signature),
                subdivision,
                accents: match euclid {
                    Some(pulses) => AccentStrategy::Euclidean { pulses, rotation },
                    None => AccentStrategy::RandomGroups,
                },
                ghost_probability: ghosts,
                ornament_probability: ornaments,
                ..GeneratorSettings::default()
            };
            let pattern = PatternGenerator::new(settings, seed).generate()?;
            print_json(&stickwork_notation::format(&pattern))
        }
        Commands::Validate { pattern } => {
            let text = pattern.load()?;
            let issues = text.validate();
            if issues.is_empty() {
                println!("✓ Pattern is valid");
                Ok(())
            } else {
                for issue in &issues {
                    eprintln!("✗ {}", issue);
                }
                std::process::exit(1);
            }
        }
    }
}
