// Building archetypes, abilities and the building entity.
//
// Every building has a `BuildingKind` (its archetype) whose static data lives
// in a `BuildingDef` in `GameConfig`: cost, build time, health and one
// `BuildingAbility`. Abilities are a closed set of variants, each exposing the
// same per-tick hook, `BuildingAbility::on_tick`, which the orchestrator calls
// for every active building during the production phase. The hook returns an
// `AbilityEffect` instead of touching the world directly; the orchestrator
// applies yields to the ledger immediately and holds volleys and vision zones
// until the combat phase, after enemies have moved.
//
// Abilities whose effect is a standing modifier rather than a per-tick event
// expose it through query methods instead: housing capacity
// (`housing_capacity`) and production auras (`aura_multiplier`).
//
// ## Lifecycle
//
//   Proposed ──assign──▶ Assigned ──worker arrives──▶ Building ──timer ≤ 0──▶ Active
//       ▲                   │                            │
//       └────unassign───────┴──────worker lost───────────┘
//
//   (any non-terminal state) ──▶ Destroyed
//
// A building under construction whose worker is unassigned or dies goes back
// to `Proposed` and keeps its remaining construction timer, so a new worker
// picks up where the last one stopped. `BuildingStatus::can_transition_to`
// encodes exactly these edges.
//
// See also: `sim/construction.rs` for the state machine and production,
// `sim/combat.rs` for volleys, vision and building destruction,
// `config.rs` for the default archetype table.

use crate::ledger::Bundle;
use crate::types::{BuildingId, CellCoord, Point, Resource, VillagerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Building archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    ClockworkForge,
    SteamMill,
    CrystalRefinery,
    AirshipDock,
    InventorsWorkshop,
    Cottage,
    TeslaCoil,
    Watchtower,
    AetherConduit,
    GrandOrrery,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 10] = [
        BuildingKind::ClockworkForge,
        BuildingKind::SteamMill,
        BuildingKind::CrystalRefinery,
        BuildingKind::AirshipDock,
        BuildingKind::InventorsWorkshop,
        BuildingKind::Cottage,
        BuildingKind::TeslaCoil,
        BuildingKind::Watchtower,
        BuildingKind::AetherConduit,
        BuildingKind::GrandOrrery,
    ];
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildingKind::ClockworkForge => "Clockwork Forge",
            BuildingKind::SteamMill => "Steam Mill",
            BuildingKind::CrystalRefinery => "Crystal Refinery",
            BuildingKind::AirshipDock => "Airship Dock",
            BuildingKind::InventorsWorkshop => "Inventor's Workshop",
            BuildingKind::Cottage => "Cottage",
            BuildingKind::TeslaCoil => "Tesla Coil",
            BuildingKind::Watchtower => "Watchtower",
            BuildingKind::AetherConduit => "Aether Conduit",
            BuildingKind::GrandOrrery => "Grand Orrery",
        };
        f.write_str(name)
    }
}

/// What an archetype does once active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuildingAbility {
    /// Adds `yields × level × multiplier` to the ledger every tick.
    Producer { yields: Bundle },
    /// Once built, can be activated for a global ×2 production boost lasting
    /// `duration` ticks, then needs `recharge` ticks before the next use.
    TradeBooster { duration: u32, recharge: u32 },
    /// Produces `amount × level` blueprints every `period` ticks.
    BlueprintGenerator { period: u32, amount: f64 },
    /// Produces like a `Producer` and adds a flat bonus to village happiness.
    Wonder { yields: Bundle, happiness_bonus: u32 },
    /// Raises the population cap.
    Housing { capacity: u32 },
    /// Every `period` ticks, hits every enemy within `range` for `damage × level`.
    Defense { range: f32, damage: f32, period: u32 },
    /// Enemies within `range` move at half speed.
    Vision { range: f32 },
    /// Multiplies production of the other buildings in the same plot.
    ProductionAura { multiplier: f64 },
}

/// Static data for one archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub description: String,
    pub cost: Bundle,
    /// Construction work units. A happy worker does 1.0 per tick.
    pub build_time: f32,
    pub max_health: f32,
    pub ability: BuildingAbility,
}

/// Lifecycle state of a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingStatus {
    /// Placed and paid for, waiting for a worker.
    Proposed,
    /// A worker accepted and is walking to the site.
    Assigned,
    /// The worker is on site; the construction timer is running.
    Building,
    /// Complete and operating.
    Active,
    /// Terminal. Filtered out of the snapshot at the end of the tick.
    Destroyed,
}

impl BuildingStatus {
    /// Whether a direct transition from `self` to `next` is legal.
    pub fn can_transition_to(self, next: BuildingStatus) -> bool {
        use BuildingStatus as S;
        matches!(
            (self, next),
            (S::Proposed, S::Assigned)
                | (S::Assigned, S::Building)
                | (S::Building, S::Active)
                | (S::Assigned, S::Proposed)
                | (S::Proposed | S::Assigned | S::Building | S::Active, S::Destroyed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == BuildingStatus::Destroyed
    }
}

/// A building entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub kind: BuildingKind,
    pub cell: CellCoord,
    pub status: BuildingStatus,
    /// Remaining construction work. Counts down while `Building`.
    pub construction_timer: f32,
    pub level: u32,
    pub health: f32,
    pub max_health: f32,
    pub assigned_villager: Option<VillagerId>,
    /// Countdown shared by periodic abilities: ticks until the next blueprint
    /// or volley, or until a trade booster is ready again. 0 means ready.
    pub cycle_timer: u32,
}

impl Building {
    pub fn new(id: BuildingId, kind: BuildingKind, cell: CellCoord, def: &BuildingDef) -> Self {
        Self {
            id,
            kind,
            cell,
            status: BuildingStatus::Proposed,
            construction_timer: def.build_time,
            level: 1,
            health: def.max_health,
            max_health: def.max_health,
            assigned_villager: None,
            cycle_timer: 0,
        }
    }

    pub fn position(&self) -> Point {
        self.cell.center()
    }

    pub fn is_active(&self) -> bool {
        self.status == BuildingStatus::Active
    }

    /// Raiders target every building that still stands.
    pub fn is_attackable(&self) -> bool {
        !self.status.is_terminal() && self.health > 0.0
    }

    /// Move to `next` if the lifecycle allows it. Returns whether it moved.
    pub fn transition(&mut self, next: BuildingStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

/// Inputs an ability needs on its tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilityEnv {
    /// Product of the trade boost, the active random event and any auras in
    /// this building's plot.
    pub production_multiplier: f64,
}

/// The outcome of one ability tick.
#[derive(Clone, Debug, PartialEq)]
pub enum AbilityEffect {
    Idle,
    Yield(Bundle),
    Volley { origin: Point, range: f32, damage: f32 },
    Watch { origin: Point, range: f32 },
}

impl BuildingAbility {
    /// The per-tick hook, called once per tick for every active building.
    pub fn on_tick(&self, building: &mut Building, env: &AbilityEnv) -> AbilityEffect {
        let level = building.level as f64;
        match self {
            BuildingAbility::Producer { yields } | BuildingAbility::Wonder { yields, .. } => {
                AbilityEffect::Yield(yields.scaled(level * env.production_multiplier))
            }
            BuildingAbility::BlueprintGenerator { period, amount } => {
                if tick_cycle(building, *period) {
                    AbilityEffect::Yield(Bundle::of(&[(Resource::Blueprints, amount * level)]))
                } else {
                    AbilityEffect::Idle
                }
            }
            BuildingAbility::Defense {
                range,
                damage,
                period,
            } => {
                if tick_cycle(building, *period) {
                    AbilityEffect::Volley {
                        origin: building.position(),
                        range: *range,
                        damage: damage * building.level as f32,
                    }
                } else {
                    AbilityEffect::Idle
                }
            }
            BuildingAbility::Vision { range } => AbilityEffect::Watch {
                origin: building.position(),
                range: *range,
            },
            BuildingAbility::TradeBooster { .. } => {
                building.cycle_timer = building.cycle_timer.saturating_sub(1);
                AbilityEffect::Idle
            }
            BuildingAbility::Housing { .. } | BuildingAbility::ProductionAura { .. } => {
                AbilityEffect::Idle
            }
        }
    }

    pub fn housing_capacity(&self) -> u32 {
        match self {
            BuildingAbility::Housing { capacity } => *capacity,
            _ => 0,
        }
    }

    pub fn aura_multiplier(&self) -> Option<f64> {
        match self {
            BuildingAbility::ProductionAura { multiplier } => Some(*multiplier),
            _ => None,
        }
    }

    pub fn happiness_bonus(&self) -> u32 {
        match self {
            BuildingAbility::Wonder {
                happiness_bonus, ..
            } => *happiness_bonus,
            _ => 0,
        }
    }
}

/// Count a periodic ability down by one tick. Returns true (and rearms the
/// timer) when it fires.
fn tick_cycle(building: &mut Building, period: u32) -> bool {
    building.cycle_timer = building.cycle_timer.saturating_sub(1);
    if building.cycle_timer == 0 {
        building.cycle_timer = period.max(1);
        true
    } else {
        false
    }
}
