// CLI entry point for headless Village Chronicles runs.
//
// Seeds a new settlement (or restores one from a save document), optionally
// lets the autopilot play, advances the requested number of ticks and prints
// a summary. With `--save` the final world is written back out as a save
// document that a later run can `--load`.
//
// Usage:
//   village-chronicles [OPTIONS]
//     --seed <SEED>            World seed (default: 42)
//     --ticks <N>              Ticks to simulate (default: 1000)
//     --config <FILE>          GameConfig JSON for a new world
//     --load <FILE>            Resume from a save document
//     --save <FILE>            Write the final world to a save document
//     --log <FILTER>           Log filter, e.g. `debug` (default: RUST_LOG or info)
//     --autopilot              Let the built-in autopilot play
//     --autopilot-every <N>    Ticks between autopilot rounds (default: 10)
//     --chronicle <N>          Chronicle entries to print (default: 10)
//     --json                   Print the summary as JSON

mod autopilot;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use village_chronicles_sim::config::GameConfig;
use village_chronicles_sim::save;
use village_chronicles_sim::sim::SimState;

use crate::autopilot::Autopilot;

#[derive(Parser, Debug)]
#[command(name = "village-chronicles")]
#[command(about = "Run a Village Chronicles settlement headless")]
struct Args {
    /// World seed for a new settlement
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// GameConfig JSON used when starting a new world
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save document to resume from
    #[arg(long)]
    load: Option<PathBuf>,

    /// Where to write the final save document
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log filter directive; falls back to RUST_LOG, then `info`
    #[arg(long)]
    log: Option<String>,

    /// Let the built-in autopilot issue actions
    #[arg(long)]
    autopilot: bool,

    /// Ticks between autopilot rounds
    #[arg(long, default_value_t = 10)]
    autopilot_every: u64,

    /// How many of the latest chronicle entries to print
    #[arg(long, default_value_t = 10)]
    chronicle: usize,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    let mut sim = match open_world(&args) {
        Ok(sim) => sim,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let mut pilot = args.autopilot.then(|| Autopilot::new(args.autopilot_every));
    let start = sim.tick;
    let mut event_count = 0usize;
    for _ in 0..args.ticks {
        if sim.game_over {
            break;
        }
        if let Some(pilot) = pilot.as_mut().filter(|p| p.is_due(&sim)) {
            pilot.act(&mut sim);
        }
        event_count += sim.tick().events.len();
    }
    info!(from = start, to = sim.tick, events = event_count, "run finished");

    if args.json {
        print_json_summary(&sim, pilot.as_ref());
    } else {
        print_summary(&sim, pilot.as_ref(), args.chronicle);
    }

    if let Some(path) = &args.save {
        if let Err(e) = save::save_to_path(&sim, path) {
            eprintln!("Failed to write save to {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "world saved");
    }
    ExitCode::SUCCESS
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Restore `--load`, or build a new world from `--seed` and `--config`.
/// An unreadable or corrupt save falls back to a new world; a bad config is
/// an error.
fn open_world(args: &Args) -> Result<SimState, String> {
    if let Some(path) = &args.load {
        if args.config.is_some() {
            warn!("--config is ignored when loading; the save carries its own");
        }
        return Ok(match save::load_from_path(path) {
            Ok(sim) => {
                info!(path = %path.display(), tick = sim.tick, "world restored");
                sim
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "save could not be restored; starting a new world");
                SimState::new(args.seed)
            }
        });
    }

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
            GameConfig::from_json(&json)
                .map_err(|e| format!("Invalid config {}: {e}", path.display()))?
        }
        None => GameConfig::default(),
    };
    Ok(SimState::with_config(args.seed, config))
}

fn print_summary(sim: &SimState, pilot: Option<&Autopilot>, chronicle: usize) {
    println!("Village Chronicles");
    println!("==================");
    println!("Tick:        {}", sim.tick);
    println!("Population:  {}/{}", sim.population, sim.max_population);
    println!("Happiness:   {}", sim.happiness);
    println!("Threat:      {}", sim.threat);
    println!("Buildings:   {} active of {}", sim.active_building_count, sim.buildings.len());
    println!("Plots:       {}", sim.grid.plot_count());
    println!("Resources:   {}", sim.ledger);
    if let Some(event) = &sim.active_event {
        if event.kind.is_instant() {
            println!("Event:       {} (cooling down, {} ticks)", event.kind, event.timer);
        } else {
            println!(
                "Event:       {} (x{} production, {} ticks left)",
                event.kind, event.multiplier, event.timer
            );
        }
    }
    if let Some(pilot) = pilot {
        println!(
            "Autopilot:   {} actions, {} rejected",
            pilot.actions_taken, pilot.actions_rejected
        );
    }
    if sim.game_over {
        println!("The village has fallen.");
    }

    if chronicle > 0 && !sim.chronicle.is_empty() {
        println!();
        println!("Chronicle:");
        let skip = sim.chronicle.len().saturating_sub(chronicle);
        for entry in &sim.chronicle[skip..] {
            println!("  [{:>6}] {}", entry.tick, entry.text);
        }
    }
}

fn print_json_summary(sim: &SimState, pilot: Option<&Autopilot>) {
    let resources: serde_json::Map<String, serde_json::Value> = sim
        .ledger
        .entries()
        .map(|(r, amount)| (r.to_string(), serde_json::json!(amount)))
        .collect();
    let summary = serde_json::json!({
        "tick": sim.tick,
        "population": sim.population,
        "max_population": sim.max_population,
        "happiness": sim.happiness,
        "threat": sim.threat,
        "active_buildings": sim.active_building_count,
        "plots": sim.grid.plot_count(),
        "resources": resources,
        "chronicle_entries": sim.chronicle.len(),
        "autopilot_actions": pilot.map(|p| p.actions_taken),
        "game_over": sim.game_over,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to encode summary: {e}"),
    }
}
