// village_chronicles_sim: pure Rust settlement simulation library.
//
// This crate contains all simulation logic for Village Chronicles: the world
// snapshot, the fixed-phase tick engine, every player action, the chronicle,
// the dialogue contract and save/load. It performs no I/O of its own and
// installs no logging subscriber, so it can be tested, benchmarked and run
// headless.
//
// Module overview:
// - `sim/`:          SimState, the tick orchestrator and its phase submodules.
// - `types.rs`:      CellCoord, PlotCoord, Point, entity IDs, Resource, Role.
// - `ledger.rs`:     Bundle (cost/yield lists) and the non-negative ResourceLedger.
// - `mood.rs`:       Mood chains, mood profiles, personalities, mood rolls.
// - `building.rs`:   Building archetypes, the lifecycle state machine, abilities.
// - `node.rs`:       Resource deposits and raider outposts.
// - `villager.rs`:   Villager entity, walking model, wanderer generation.
// - `enemy.rs`:      Raider entity.
// - `grid.rs`:       Sparse cell map and unlocked plot set.
// - `command.rs`:    SimAction / ActionOutcome / ActionError, all player mutations.
// - `event.rs`:      Random event kinds and the per-tick SimEvent output.
// - `chronicle.rs`:  Template-driven narrative log.
// - `dialogue.rs`:   DialogueService contract and the scripted provider.
// - `config.rs`:     GameConfig, every tunable parameter.
// - `save.rs`:       Versioned save documents and restore normalization.
// - `prng`:          Re-exported from `village_chronicles_prng`: xoshiro256++ PRNG
//                    with SplitMix64 seeding.
//
// **Critical constraint: determinism.** The simulation is a pure function:
// `(state, actions) -> (new_state, events)`. All randomness comes from the
// seeded PRNG carried inside the snapshot. No `HashMap`, no system time, no
// OS entropy. Use `BTreeMap` for ordered collections.

pub mod building;
pub mod chronicle;
pub mod command;
pub mod config;
pub mod dialogue;
pub mod enemy;
pub mod event;
pub mod grid;
pub mod ledger;
pub mod mood;
pub mod node;
pub use village_chronicles_prng as prng;
pub mod save;
pub mod sim;
pub mod types;
pub mod villager;
