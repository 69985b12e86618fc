// Core simulation state and the tick orchestrator.
//
// `SimState` is the single source of truth for the settlement: ledger, grid,
// buildings, villagers, nodes, raiders, the chronicle, global timers,
// aggregates, the config and the PRNG. Everything a save needs is in here and
// nothing outside it influences the simulation.
//
// ## Two ways to advance
//
// - `tick(&mut self)` advances the world in place by one step and returns the
//   `SimEvent`s it produced.
// - `advance(&self)` is the pure form: it clones the snapshot, ticks the
//   clone and returns it, leaving the input untouched.
//
// Player actions work the same way (`apply` in place, `reduce` pure); see
// `command.rs`.
//
// ## Tick phases
//
// Every tick runs the same fixed sequence over the one snapshot. Later phases
// see the writes of earlier ones; no phase looks ahead.
//
//   1. villagers: rest, mood timers, walking; harvesters extract
//   2. node respawn sweep and grid cleanup
//   3. buildings: arrivals, construction progress, abilities and production
//   4. population cap and overcrowding
//   5. raiders: spawn, retarget, move, tower volleys, melee
//   6. outpost sieges
//   7. militia AI
//   8. remove the dead and the destroyed; detect game over
//   9. wanderer arrivals
//  10. trade boost and random event timers
//  11. random event roll
//  12. aggregates: happiness, population, threat, active buildings
//
// Once every villager is gone `game_over` is set and `tick` returns
// immediately without touching anything, including the tick counter.
//
// The phases live in the submodules, grouped by subsystem:
// `agents.rs` (1, mood actions, dialogue), `harvest.rs` (1, 2, 6, node
// assignment), `construction.rs` (3, placement, assignment, upgrades, trade
// boost), `population.rs` (4, 9, wanderers), `combat.rs` (5, 7, 8, rally),
// `events.rs` (10, 11), `plots.rs` (world seeding, plot unlocking).
//
// See also: `command.rs` for actions, `save.rs` for persistence,
// `config.rs` for every tunable used here.
//
// **Critical constraint: determinism.** All randomness comes from `self.rng`
// and all iteration is over `BTreeMap`s. The same seed, config and action
// sequence always produce the same snapshot.

mod agents;
mod combat;
mod construction;
mod events;
mod harvest;
mod plots;
mod population;

pub use combat::ThreatLevel;

use crate::building::{Building, BuildingKind};
use crate::chronicle::{self, ChronicleEvent, ChronicleKey};
use crate::command::{ActionError, ActionOutcome, SimAction};
use crate::config::GameConfig;
use crate::enemy::Enemy;
use crate::event::{ActiveEvent, SimEvent, SimEventKind};
use crate::grid::Grid;
use crate::ledger::ResourceLedger;
use crate::node::ResourceNode;
use crate::prng::GameRng;
use crate::types::{BuildingId, EnemyId, IdAllocator, NodeId, VillagerId};
use crate::villager::{Villager, Wanderer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// The entire settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks simulated so far.
    pub tick: u64,
    pub rng: GameRng,
    pub config: GameConfig,
    pub ids: IdAllocator,
    pub ledger: ResourceLedger,
    pub grid: Grid,
    pub buildings: BTreeMap<BuildingId, Building>,
    pub villagers: BTreeMap<VillagerId, Villager>,
    pub nodes: BTreeMap<NodeId, ResourceNode>,
    pub enemies: BTreeMap<EnemyId, Enemy>,
    /// Append-only narrative log.
    pub chronicle: Vec<ChronicleEvent>,
    /// Ticks of trade boost left; 0 when no boost is running.
    pub trade_boost_timer: u32,
    pub active_event: Option<ActiveEvent>,
    pub pending_wanderer: Option<Wanderer>,
    pub population: usize,
    pub max_population: u32,
    /// Village happiness, 0-100.
    pub happiness: u32,
    pub threat: ThreatLevel,
    pub active_building_count: usize,
    pub game_over: bool,
}

/// What one tick produced.
#[derive(Clone, Debug, Default)]
pub struct TickResult {
    pub events: Vec<SimEvent>,
}

impl SimState {
    /// Create a new settlement with the default config.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, GameConfig::default())
    }

    /// Create a new settlement: the home plot with one deposit of each kind,
    /// the starting villagers and the starting ledger.
    pub fn with_config(seed: u64, config: GameConfig) -> Self {
        let ledger = ResourceLedger::from_bundle(&config.world.starting_resources);
        let mut state = Self {
            tick: 0,
            rng: GameRng::new(seed),
            config,
            ids: IdAllocator::default(),
            ledger,
            grid: Grid::new(),
            buildings: BTreeMap::new(),
            villagers: BTreeMap::new(),
            nodes: BTreeMap::new(),
            enemies: BTreeMap::new(),
            chronicle: Vec::new(),
            trade_boost_timer: 0,
            active_event: None,
            pending_wanderer: None,
            population: 0,
            max_population: 0,
            happiness: 50,
            threat: ThreatLevel::Calm,
            active_building_count: 0,
            game_over: false,
        };
        state.seed_world();
        state.recompute_aggregates();
        state
    }

    // -----------------------------------------------------------------------
    // Tick orchestration
    // -----------------------------------------------------------------------

    /// Advance the world by one tick in place.
    pub fn tick(&mut self) -> TickResult {
        let mut events = Vec::new();
        if self.game_over {
            return TickResult { events };
        }
        self.tick += 1;

        self.step_villagers(&mut events);
        self.step_harvesters(&mut events);
        self.sweep_nodes(&mut events);
        let effects = self.step_buildings(&mut events);
        self.update_population();
        self.step_enemies(&effects, &mut events);
        self.resolve_sieges(&mut events);
        self.step_militia(&mut events);
        self.remove_the_dead(&mut events);
        if self.game_over {
            self.recompute_aggregates();
            return TickResult { events };
        }
        self.check_wanderers(&mut events);
        self.tick_timers(&mut events);
        self.roll_random_event(&mut events);
        self.recompute_aggregates();

        TickResult { events }
    }

    /// Pure form of `tick`: the input snapshot is left untouched.
    pub fn advance(&self) -> Self {
        let mut next = self.clone();
        next.tick();
        next
    }

    /// Run `ticks` ticks, stopping early on game over.
    pub fn run(&mut self, ticks: u64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            if self.game_over {
                break;
            }
            events.extend(self.tick().events);
        }
        events
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Apply a player action in place.
    pub fn apply(&mut self, action: &SimAction) -> Result<ActionOutcome, ActionError> {
        match *action {
            SimAction::PlaceBuilding { kind, cell } => self.place_building(kind, cell),
            SimAction::AssignVillager { building, villager } => {
                self.assign_villager(building, villager)
            }
            SimAction::AssignVillagerToNode { node, villager } => {
                self.assign_villager_to_node(node, villager)
            }
            SimAction::UnassignVillager { villager } => self.unassign_villager(villager),
            SimAction::NegotiateWithVillager { villager } => self.negotiate_with_villager(villager),
            SimAction::WorsenVillagerMood { villager } => self.worsen_villager_mood(villager),
            SimAction::BribeVillager { villager } => self.bribe_villager(villager),
            SimAction::RestVillager { villager } => self.rest_villager(villager),
            SimAction::UpgradeBuilding { building } => self.upgrade_building(building),
            SimAction::ActivateTradeBoost { building } => self.activate_trade_boost(building),
            SimAction::UnlockPlot { plot } => self.unlock_plot(plot),
            SimAction::SetMilitia { villager, enlisted } => self.set_militia(villager, enlisted),
            SimAction::RallyMilitiaTo { enemy } => self.rally_militia_to(enemy),
            SimAction::AcceptWanderer => self.accept_wanderer(),
            SimAction::RejectWanderer => self.reject_wanderer(),
        }
    }

    /// Pure form of `apply`: returns the next snapshot and the action result.
    pub fn reduce(&self, action: &SimAction) -> (Self, Result<ActionOutcome, ActionError>) {
        let mut next = self.clone();
        let result = next.apply(action);
        (next, result)
    }

    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.game_over {
            Err(ActionError::GameOver)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// Append a chronicle entry.
    fn record(&mut self, key: ChronicleKey, vars: &[(&str, &str)], building: Option<BuildingKind>) {
        let entry = chronicle::compose(&mut self.ids, &mut self.rng, self.tick, key, vars, building);
        self.chronicle.push(entry);
    }

    fn emit(&self, events: &mut Vec<SimEvent>, kind: SimEventKind) {
        events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }

    fn villager_name(&self, id: VillagerId) -> String {
        self.villagers
            .get(&id)
            .map(|v| v.name.clone())
            .unwrap_or_default()
    }

    /// Global production multiplier: trade boost times the running event.
    pub fn production_multiplier(&self) -> f64 {
        let boost = if self.trade_boost_timer > 0 { 2.0 } else { 1.0 };
        let event = self.active_event.map_or(1.0, |e| e.multiplier);
        boost * event
    }

    pub fn is_overcrowded(&self) -> bool {
        self.villagers.len() as u64 > self.max_population as u64
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Phase 12. Derived fields are only ever written here and in
    /// `update_population`.
    pub(crate) fn recompute_aggregates(&mut self) {
        self.update_population();
        self.happiness = self.compute_happiness();
        self.threat = ThreatLevel::from_enemy_count(
            self.enemies.values().filter(|e| e.is_alive()).count(),
            &self.config.combat,
        );
        self.active_building_count = self.buildings.values().filter(|b| b.is_active()).count();
    }

    /// Mean mood score of all villagers (50 with nobody left), plus the bonus
    /// of every active wonder, clamped to 0..=100.
    pub fn compute_happiness(&self) -> u32 {
        let base = if self.villagers.is_empty() {
            50
        } else {
            let total: u64 = self
                .villagers
                .values()
                .map(|v| self.config.mood(v.mood).happiness_score as u64)
                .sum();
            let n = self.villagers.len() as u64;
            ((total + n / 2) / n) as u32
        };
        let bonus: u32 = self
            .buildings
            .values()
            .filter(|b| b.is_active())
            .filter_map(|b| self.config.buildings.get(&b.kind))
            .map(|def| def.ability.happiness_bonus())
            .sum();
        (base + bonus).min(100)
    }

    fn declare_game_over(&mut self, events: &mut Vec<SimEvent>) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        info!(tick = self.tick, "the last villager is gone; game over");
        self.record(ChronicleKey::GameOver, &[], None);
        self.emit(events, SimEventKind::GameOver);
    }
}
