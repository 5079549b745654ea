mod report;
mod simulation;

use anyhow::{Context, Result, bail};
use charlatan_game::{Lexicon, ModeFlags, Player, normalize_name};
use chrono::{Local, Timelike, Utc};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

use report::{aggregate, render};
use simulation::{SimulationConfig, SimulationSession};

#[derive(Debug, Parser)]
#[command(name = "charlatan-tester", version)]
#[command(about = "Headless fairness and QA harness for the Charlatan selection engine")]
struct Args {
    /// Number of rounds to simulate
    #[arg(long, default_value_t = 500)]
    rounds: u32,

    /// Comma-separated roster names
    #[arg(long, default_value = "Ana,Bruno,Carla,Diego,Elena")]
    players: String,

    /// Impostors per round
    #[arg(long, default_value_t = 1)]
    impostors: usize,

    /// RNG seed; derived from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Enable hint mode (impostors see a hint instead of the sentinel)
    #[arg(long)]
    hint: bool,

    /// Enable troll mode (chaos rounds and the pandora protocol)
    #[arg(long)]
    troll: bool,

    /// Enable architect mode (curated word rounds)
    #[arg(long)]
    architect: bool,

    /// Enable party mode (longest-name opener rule)
    #[arg(long)]
    party: bool,

    /// Comma-separated category filter; empty means all
    #[arg(long, default_value = "")]
    categories: String,

    /// Load the word catalog from a JSON file instead of the embedded one
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Emit the report as JSON instead of the human summary
    #[arg(long)]
    json: bool,
}

fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn build_roster(names: &[String]) -> Result<Vec<Player>> {
    if names.len() < 2 {
        bail!("need at least two players, got {}", names.len());
    }
    // Vault attribution is undefined for colliding normalized names; the
    // engine documents this as a caller constraint, so enforce it here.
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(normalize_name(name)) {
            bail!("duplicate player name after normalization: {name}");
        }
    }
    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| Player::new(i.to_string(), name.clone()))
        .collect())
}

fn load_lexicon(path: Option<&PathBuf>) -> Result<Lexicon> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Lexicon::from_json(&raw).context("parsing word catalog")
        }
        None => Ok(Lexicon::load_from_static()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let names = split_csv(&args.players);
    let players = build_roster(&names)?;
    if args.impostors == 0 || args.impostors >= players.len() {
        bail!(
            "impostor count must be within 1..{} for this roster",
            players.len()
        );
    }

    let lexicon = load_lexicon(args.lexicon.as_ref())?;
    if lexicon.is_empty() {
        bail!("word catalog has no usable categories");
    }

    let now = Utc::now();
    let seed = args
        .seed
        .unwrap_or_else(|| now.timestamp_millis().unsigned_abs());
    let config = SimulationConfig {
        seed,
        rounds: args.rounds,
        impostor_count: args.impostors,
        modes: ModeFlags {
            hint: args.hint,
            troll: args.troll,
            architect: args.architect,
            party: args.party,
        },
        selected_categories: split_csv(&args.categories),
        local_hour: Local::now().hour(),
        timestamp_ms: now.timestamp_millis(),
    };

    log::info!(
        "simulating {} rounds, {} players, seed {seed:#x}",
        config.rounds,
        players.len()
    );

    let mut session = SimulationSession::new(lexicon, players.clone(), config);
    let mut records = Vec::with_capacity(args.rounds as usize);
    for _ in 0..args.rounds {
        records.push(session.advance()?);
    }

    let violations = session.violations().to_vec();
    let report = aggregate(seed, &players, &records, session.history(), &violations);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&report);
    }

    if !report.passed() {
        bail!("{} invariant violations detected", report.violations.len());
    }
    Ok(())
}
