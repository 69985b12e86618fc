// Random village events and player-visible simulation events.
//
// This file holds two related but distinct concepts:
// - `RandomEventKind` / `ActiveEvent`: the happiness-weighted global
//   modifiers rolled by the random event engine. Surges and slowdowns carry
//   a production multiplier for a fixed number of ticks. Feud outbreaks and
//   festivals apply immediately and only occupy a cooldown window.
// - `SimEvent`: typed output describing what happened during a tick, for
//   UIs, logs and tests. Unlike the chronicle these are not stored in the
//   snapshot; `SimState::tick` returns them.
//
// See also: `sim/events.rs` for rolling and applying random events,
// `chronicle.rs` for the narrative log.

use crate::building::BuildingKind;
use crate::config::EventConfig;
use crate::prng::GameRng;
use crate::types::{BuildingId, EnemyId, NodeId, Resource, VillagerId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Random events
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEventKind {
    ProductionSurge,
    WorkerSlowdown,
    FeudOutbreak,
    Festival,
}

impl RandomEventKind {
    /// Whether the event applies once and only blocks re-rolls for a while.
    pub fn is_instant(self) -> bool {
        matches!(self, RandomEventKind::FeudOutbreak | RandomEventKind::Festival)
    }
}

impl fmt::Display for RandomEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RandomEventKind::ProductionSurge => "Production Surge",
            RandomEventKind::WorkerSlowdown => "Worker Slowdown",
            RandomEventKind::FeudOutbreak => "Feud Outbreak",
            RandomEventKind::Festival => "Festival",
        };
        f.write_str(label)
    }
}

/// The event currently in effect (or cooling down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub kind: RandomEventKind,
    /// Global production multiplier while active. 1.0 for instant events.
    pub multiplier: f64,
    /// Ticks left.
    pub timer: u32,
}

impl ActiveEvent {
    pub fn new(kind: RandomEventKind, config: &EventConfig) -> Self {
        let (multiplier, timer) = match kind {
            RandomEventKind::ProductionSurge => (config.surge_multiplier, config.modifier_duration),
            RandomEventKind::WorkerSlowdown => {
                (config.slowdown_multiplier, config.modifier_duration)
            }
            RandomEventKind::FeudOutbreak | RandomEventKind::Festival => {
                (1.0, config.instant_cooldown)
            }
        };
        Self {
            kind,
            multiplier,
            timer: timer.max(1),
        }
    }
}

/// Roll for a new event. Returns `None` most ticks.
///
/// Happy villages mostly get surges and festivals, miserable ones mostly get
/// slowdowns and feuds, and anything in between draws all four evenly.
pub fn roll_random_event(
    happiness: u32,
    config: &EventConfig,
    rng: &mut GameRng,
) -> Option<RandomEventKind> {
    if !rng.chance(config.roll_chance) {
        return None;
    }
    let kind = if happiness >= config.high_happiness {
        if rng.chance(config.high_surge_share) {
            RandomEventKind::ProductionSurge
        } else {
            RandomEventKind::Festival
        }
    } else if happiness <= config.low_happiness {
        if rng.chance(config.low_slowdown_share) {
            RandomEventKind::WorkerSlowdown
        } else {
            RandomEventKind::FeudOutbreak
        }
    } else {
        match rng.range_u32(0, 4) {
            0 => RandomEventKind::ProductionSurge,
            1 => RandomEventKind::WorkerSlowdown,
            2 => RandomEventKind::Festival,
            _ => RandomEventKind::FeudOutbreak,
        }
    };
    Some(kind)
}

// ---------------------------------------------------------------------------
// Player-visible simulation events (output)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    ConstructionStarted { building: BuildingId },
    BuildingCompleted { building: BuildingId, kind: BuildingKind },
    BuildingDestroyed { building: BuildingId, kind: BuildingKind },
    Harvested { node: NodeId, villager: VillagerId, resource: Resource, amount: f64 },
    NodeDepleted { node: NodeId },
    NodeRespawned { node: NodeId },
    OutpostFallen { node: NodeId },
    MoodShifted { villager: VillagerId },
    RestCompleted { villager: VillagerId },
    RaidSpawned { count: u32 },
    EnemyKilled { enemy: EnemyId },
    VillagerDied { villager: VillagerId },
    WandererArrived { name: String },
    RandomEvent { kind: RandomEventKind },
    TradeBoostEnded,
    GameOver,
}
