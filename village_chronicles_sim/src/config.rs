// Data-driven game configuration.
//
// Every tunable simulation parameter lives in `GameConfig`, loaded from JSON
// (`GameConfig::from_json`) or taken from `Default`, which carries the
// shipped balance. The sim reads all numbers from here instead of embedding
// them, so balance can change without recompiling and tests can pin
// behavior (e.g. force refusal chance to 1.0, disable raids).
//
// The config is grouped the way the subsystems are:
// - lookup tables keyed by enum: `moods`, `personalities`, `buildings`,
//   `nodes`;
// - one struct per subsystem: `VillagerConfig`, `HarvestConfig`,
//   `PopulationConfig`, `CombatConfig`, `EventConfig`;
// - `WorldConfig` for the starting world, plot unlocking and wanderers.
//
// Lookups that can miss (a hand-written JSON config may omit an entry) fall
// back to neutral values rather than panicking: a missing mood profile acts
// like a happy worker, a missing personality rolls happy.
//
// See also: `sim/mod.rs`, which owns the `GameConfig` as part of `SimState`.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic. A replay must use the config it was recorded with.

use crate::building::{BuildingAbility, BuildingDef, BuildingKind};
use crate::ledger::Bundle;
use crate::mood::{Mood, MoodProfile, MoodWeights, Personality};
use crate::node::{NodeDef, NodeKind};
use crate::types::{CellCoord, Resource, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Subsystem parameter groups
// ---------------------------------------------------------------------------

/// Villager movement, rest, mood timers and player mood actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VillagerConfig {
    /// Walk progress gained per tick by a happy villager. Scaled by the
    /// mood's work speed.
    pub walk_step: f32,
    /// Ticks a rest order lasts.
    pub rest_duration: u32,
    /// Mood timers are drawn uniformly from `[mood_timer_min, mood_timer_max)`.
    pub mood_timer_min: u32,
    pub mood_timer_max: u32,
    /// Negotiation attempts after which refusal is always forgiven.
    pub mercy_threshold: u32,
    /// Gears a bribe costs.
    pub bribe_cost: f64,
    pub max_health: f32,
}

/// Node extraction cadence and respawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Ticks between extractions for an on-site harvester.
    pub period: u32,
    /// Ticks a depleted node stays empty before refilling.
    pub respawn_ticks: u32,
}

/// Housing and overcrowding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Population cap before any housing is built.
    pub base_cap: u32,
    /// Extra mood-timer ticks drained per tick while overcrowded.
    pub overcrowding_drain: u32,
}

/// Raiders, defenses, militia and sieges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// No raids before this tick.
    pub grace_period: u64,
    /// Spawn chance per tick right after the grace period.
    pub spawn_chance_base: f64,
    /// Added to the spawn chance for every tick past the grace period.
    pub spawn_chance_growth: f64,
    pub spawn_chance_max: f64,
    /// Every this many ticks past the grace period, raids grow by one enemy.
    pub group_growth_interval: u64,
    /// Largest raid while the village has no active housing.
    pub group_cap_without_housing: u32,
    /// With housing, the raid cap is this times the number of unlocked plots.
    pub group_cap_per_plot: u32,
    pub enemy_base_health: f32,
    /// Enemy max health gained per `enemy_health_interval` ticks past the
    /// grace period.
    pub enemy_health_growth: f32,
    pub enemy_health_interval: u64,
    pub enemy_max_health_cap: f32,
    /// Cells per tick.
    pub enemy_speed: f32,
    pub melee_range: f32,
    pub enemy_building_damage: f32,
    pub enemy_villager_damage: f32,
    /// Crystals awarded per raider killed.
    pub kill_bounty: f64,
    /// Cells per tick for militia on the hunt.
    pub militia_speed: f32,
    pub militia_damage: f32,
    /// Militia strike once every this many ticks while in melee range.
    pub militia_attack_period: u32,
    pub militia_regen: f32,
    pub rest_regen: f32,
    /// Outpost damage per present attacker per tick.
    pub siege_damage_per_attacker: f64,
    /// Attackers that must be present at once before a siege does damage.
    pub siege_quorum: u32,
    pub outpost_payout: Bundle,
    /// Live-enemy counts at which the threat level rises to watchful, raid
    /// and siege.
    pub threat_watchful: usize,
    pub threat_raid: usize,
    pub threat_siege: usize,
}

/// Random event rolls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub roll_chance: f64,
    /// Happiness at or above which events lean positive.
    pub high_happiness: u32,
    /// Happiness at or below which events lean negative.
    pub low_happiness: u32,
    /// Share of positive-band rolls that are production surges (the rest are
    /// festivals).
    pub high_surge_share: f64,
    /// Share of negative-band rolls that are slowdowns (the rest are feuds).
    pub low_slowdown_share: f64,
    pub surge_multiplier: f64,
    pub slowdown_multiplier: f64,
    /// Ticks a production surge or slowdown lasts.
    pub modifier_duration: u32,
    /// Ticks an instant event blocks further rolls.
    pub instant_cooldown: u32,
}

/// A villager present when a new world is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartingVillager {
    pub name: String,
    pub role: Role,
    pub personality: Personality,
    pub cell: CellCoord,
}

/// Starting world, expansion and arrivals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub starting_resources: Bundle,
    pub starting_villagers: Vec<StartingVillager>,
    /// Gears per already-unlocked plot charged to unlock the next one.
    pub plot_unlock_cost: f64,
    /// Deposits scattered on a freshly unlocked plot.
    pub nodes_per_plot: u32,
    /// Chance a freshly unlocked plot also holds a raider outpost.
    pub outpost_chance: f64,
    /// Ticks between wanderer arrival checks.
    pub wanderer_interval: u64,
    /// Active-building counts that earn a milestone chronicle.
    pub milestones: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Top-level game config
// ---------------------------------------------------------------------------

/// Top-level game configuration. Loaded once, never mutated by the sim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub moods: BTreeMap<Mood, MoodProfile>,
    pub personalities: BTreeMap<Personality, MoodWeights>,
    pub buildings: BTreeMap<BuildingKind, BuildingDef>,
    pub nodes: BTreeMap<NodeKind, NodeDef>,
    pub villager: VillagerConfig,
    pub harvest: HarvestConfig,
    pub population: PopulationConfig,
    pub combat: CombatConfig,
    pub events: EventConfig,
    pub world: WorldConfig,
}

const NEUTRAL_MOOD: MoodProfile = MoodProfile {
    work_speed: 1.0,
    refusal_chance: 0.0,
    happiness_score: 50,
};

impl GameConfig {
    /// Parse a config from JSON. Every field is required.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn mood(&self, mood: Mood) -> MoodProfile {
        self.moods.get(&mood).copied().unwrap_or(NEUTRAL_MOOD)
    }

    pub fn personality(&self, personality: Personality) -> MoodWeights {
        self.personalities
            .get(&personality)
            .copied()
            .unwrap_or(MoodWeights::new(1, 0, 0, 0, 0))
    }

    pub fn building(&self, kind: BuildingKind) -> Option<&BuildingDef> {
        self.buildings.get(&kind)
    }

    pub fn node(&self, kind: NodeKind) -> Option<&NodeDef> {
        self.nodes.get(&kind)
    }
}

fn building(
    description: &str,
    cost: &[(Resource, f64)],
    build_time: f32,
    max_health: f32,
    ability: BuildingAbility,
) -> BuildingDef {
    BuildingDef {
        description: description.to_string(),
        cost: Bundle::of(cost),
        build_time,
        max_health,
        ability,
    }
}

fn default_buildings() -> BTreeMap<BuildingKind, BuildingDef> {
    use Resource::*;
    let mut b = BTreeMap::new();
    b.insert(
        BuildingKind::ClockworkForge,
        building(
            "Hammers out precision gears day and night.",
            &[],
            10.0,
            30.0,
            BuildingAbility::Producer {
                yields: Bundle::of(&[(Gears, 5.0)]),
            },
        ),
    );
    b.insert(
        BuildingKind::SteamMill,
        building(
            "Pressure chambers that bottle raw steam.",
            &[(Gears, 50.0)],
            15.0,
            30.0,
            BuildingAbility::Producer {
                yields: Bundle::of(&[(Steam, 3.0)]),
            },
        ),
    );
    b.insert(
        BuildingKind::CrystalRefinery,
        building(
            "Distills aether into crystals.",
            &[(Gears, 100.0), (Steam, 50.0)],
            30.0,
            35.0,
            BuildingAbility::Producer {
                yields: Bundle::of(&[(Crystals, 1.0)]),
            },
        ),
    );
    b.insert(
        BuildingKind::AirshipDock,
        building(
            "Trade zeppelins double all output for a while.",
            &[(Gears, 80.0), (Steam, 40.0), (Crystals, 20.0)],
            45.0,
            40.0,
            BuildingAbility::TradeBooster {
                duration: 30,
                recharge: 60,
            },
        ),
    );
    b.insert(
        BuildingKind::InventorsWorkshop,
        building(
            "Turns out blueprints for upgrades.",
            &[(Gears, 150.0), (Steam, 75.0), (Crystals, 30.0)],
            60.0,
            35.0,
            BuildingAbility::BlueprintGenerator {
                period: 20,
                amount: 1.0,
            },
        ),
    );
    b.insert(
        BuildingKind::Cottage,
        building(
            "A snug home for two more villagers.",
            &[(Wood, 30.0), (Stone, 20.0)],
            20.0,
            25.0,
            BuildingAbility::Housing { capacity: 2 },
        ),
    );
    b.insert(
        BuildingKind::TeslaCoil,
        building(
            "Arcs lightning at raiders in range.",
            &[(Gears, 60.0), (Metal, 20.0), (Crystals, 10.0)],
            25.0,
            40.0,
            BuildingAbility::Defense {
                range: 3.5,
                damage: 3.0,
                period: 3,
            },
        ),
    );
    b.insert(
        BuildingKind::Watchtower,
        building(
            "Lookouts slow raiders within sight.",
            &[(Wood, 40.0), (Stone, 30.0)],
            20.0,
            30.0,
            BuildingAbility::Vision { range: 4.0 },
        ),
    );
    b.insert(
        BuildingKind::AetherConduit,
        building(
            "Boosts every other building in its plot.",
            &[(Metal, 30.0), (Water, 20.0), (Crystals, 25.0)],
            30.0,
            30.0,
            BuildingAbility::ProductionAura { multiplier: 1.25 },
        ),
    );
    b.insert(
        BuildingKind::GrandOrrery,
        building(
            "A clockwork model of the heavens. The pride of the village.",
            &[(Gears, 400.0), (Crystals, 120.0), (Blueprints, 20.0)],
            120.0,
            60.0,
            BuildingAbility::Wonder {
                yields: Bundle::of(&[(Gears, 3.0), (Steam, 2.0), (Crystals, 1.0)]),
                happiness_bonus: 10,
            },
        ),
    );
    b
}

fn default_nodes() -> BTreeMap<NodeKind, NodeDef> {
    let mut n = BTreeMap::new();
    let mut def = |kind, resource, amount_per_harvest, max_amount| {
        n.insert(
            kind,
            NodeDef {
                resource,
                amount_per_harvest,
                max_amount,
            },
        );
    };
    def(NodeKind::Timber, Resource::Wood, 8.0, 120.0);
    def(NodeKind::Stone, Resource::Stone, 5.0, 150.0);
    def(NodeKind::Metal, Resource::Metal, 3.0, 80.0);
    def(NodeKind::Water, Resource::Water, 10.0, 200.0);
    def(NodeKind::Outpost, Resource::Crystals, 0.0, 500.0);
    n
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut moods = BTreeMap::new();
        let mut mood = |m, work_speed, refusal_chance, happiness_score| {
            moods.insert(
                m,
                MoodProfile {
                    work_speed,
                    refusal_chance,
                    happiness_score,
                },
            );
        };
        mood(Mood::Happy, 1.0, 0.0, 100);
        mood(Mood::Tired, 0.7, 0.1, 60);
        mood(Mood::Grumpy, 0.5, 0.3, 20);
        mood(Mood::Lazy, 0.6, 0.4, 40);
        mood(Mood::Feuding, 0.8, 0.6, 10);

        let personalities = BTreeMap::from([
            (Personality::Diligent, MoodWeights::new(5, 2, 1, 0, 1)),
            (Personality::Lazy, MoodWeights::new(1, 3, 1, 4, 1)),
            (Personality::Hothead, MoodWeights::new(1, 1, 4, 1, 3)),
            (Personality::Cheerful, MoodWeights::new(6, 2, 0, 1, 0)),
        ]);

        Self {
            moods,
            personalities,
            buildings: default_buildings(),
            nodes: default_nodes(),
            villager: VillagerConfig {
                walk_step: 0.1,
                rest_duration: 15,
                mood_timer_min: 20,
                mood_timer_max: 40,
                mercy_threshold: 3,
                bribe_cost: 25.0,
                max_health: 10.0,
            },
            harvest: HarvestConfig {
                period: 5,
                respawn_ticks: 60,
            },
            population: PopulationConfig {
                base_cap: 3,
                overcrowding_drain: 2,
            },
            combat: CombatConfig {
                grace_period: 120,
                spawn_chance_base: 0.01,
                spawn_chance_growth: 0.00001,
                spawn_chance_max: 0.04,
                group_growth_interval: 400,
                group_cap_without_housing: 1,
                group_cap_per_plot: 2,
                enemy_base_health: 5.0,
                enemy_health_growth: 1.0,
                enemy_health_interval: 200,
                enemy_max_health_cap: 30.0,
                enemy_speed: 0.08,
                melee_range: 1.6,
                enemy_building_damage: 1.0,
                enemy_villager_damage: 2.0,
                kill_bounty: 2.0,
                militia_speed: 0.12,
                militia_damage: 2.0,
                militia_attack_period: 2,
                militia_regen: 0.2,
                rest_regen: 0.5,
                siege_damage_per_attacker: 2.0,
                siege_quorum: 3,
                outpost_payout: Bundle::of(&[
                    (Resource::Crystals, 100.0),
                    (Resource::Blueprints, 10.0),
                ]),
                threat_watchful: 1,
                threat_raid: 3,
                threat_siege: 8,
            },
            events: EventConfig {
                roll_chance: 0.03,
                high_happiness: 70,
                low_happiness: 30,
                high_surge_share: 0.7,
                low_slowdown_share: 0.6,
                surge_multiplier: 1.5,
                slowdown_multiplier: 0.5,
                modifier_duration: 15,
                instant_cooldown: 10,
            },
            world: WorldConfig {
                starting_resources: Bundle::of(&[(Resource::Gears, 100.0)]),
                starting_villagers: vec![
                    StartingVillager {
                        name: "Barnaby Cogsworth".into(),
                        role: Role::Engineer,
                        personality: Personality::Diligent,
                        cell: CellCoord::new(2, 2),
                    },
                    StartingVillager {
                        name: "Elara Steamwright".into(),
                        role: Role::Alchemist,
                        personality: Personality::Cheerful,
                        cell: CellCoord::new(5, 3),
                    },
                    StartingVillager {
                        name: "Thaddeus Ironclaw".into(),
                        role: Role::Merchant,
                        personality: Personality::Hothead,
                        cell: CellCoord::new(4, 6),
                    },
                ],
                plot_unlock_cost: 100.0,
                nodes_per_plot: 3,
                outpost_chance: 0.35,
                wanderer_interval: 90,
                milestones: vec![5, 10],
            },
        }
    }
}
