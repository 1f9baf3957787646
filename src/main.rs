use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, LevelFilter};

use cleansight_lib::{
    aggregate::{aggregate, AggregateKind, MemoryGridSource, RoomQuery},
    analytics::{score_record, ScoringConfig},
    grid::high_touch_mask,
    init_logging_with_level,
    models::SessionRecord,
    SurfaceProfiles,
};

/// Score cleaning sessions and summarise rooms from recorded session files.
#[derive(Parser)]
#[command(name = "cleansight", version, about)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and score one session record.
    Score {
        record: PathBuf,
        #[arg(long, default_value_t = 3)]
        overwipe_threshold: u32,
    },
    /// Aggregate a JSON array of session records for one room.
    Aggregate {
        records: PathBuf,
        #[arg(long)]
        room: String,
        #[arg(long)]
        surface_type: String,
        #[arg(long, default_value_t = 50)]
        sessions: usize,
        #[arg(long, default_value_t = 20)]
        top: usize,
        #[arg(long, value_enum, default_value_t = Kind::Touched)]
        kind: Kind,
        /// Overwipe threshold for `--kind overwiped`.
        #[arg(long, default_value_t = 3)]
        threshold: u32,
    },
    /// Print the high-touch mask for a surface type.
    Mask {
        surface_type: String,
        /// Surface profile file; built-in profiles when omitted.
        #[arg(long)]
        profiles: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Touched,
    Disregarded,
    Overwiped,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    init_logging_with_level(level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Score {
            record,
            overwipe_threshold,
        } => {
            let record: SessionRecord = read_json(&record)?;
            let metrics = score_record(&record, overwipe_threshold, &ScoringConfig::default())
                .with_context(|| format!("Session {} rejected", record.session_id))?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        Commands::Aggregate {
            records,
            room,
            surface_type,
            sessions,
            top,
            kind,
            threshold,
        } => {
            let records: Vec<SessionRecord> = read_json(&records)?;
            let source = MemoryGridSource::from_records(&records);
            let query = RoomQuery {
                room_id: room,
                surface_type,
                max_sessions: sessions,
                top_k: top,
            };
            let kind = match kind {
                Kind::Touched => AggregateKind::MostTouched,
                Kind::Disregarded => AggregateKind::MostDisregarded,
                Kind::Overwiped => AggregateKind::OverwipedHotspots { threshold },
            };
            let result = aggregate(&source, &query, kind)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Mask {
            surface_type,
            profiles,
        } => {
            let profiles = match profiles {
                Some(path) => SurfaceProfiles::load(&path)?,
                None => SurfaceProfiles::default(),
            };
            let profile = profiles.get(&surface_type)?;
            let mask = high_touch_mask(profile.pattern, profile.grid_h, profile.grid_w);
            for row in mask.to_wire() {
                let line: Vec<String> = row.iter().map(u8::to_string).collect();
                println!("{}", line.join(" "));
            }
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
