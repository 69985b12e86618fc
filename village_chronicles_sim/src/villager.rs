// Villager entity, movement model and wanderer generation.
//
// A villager's position is described by three fields:
// - `position`: where the villager last settled;
// - `target`: where it is walking, if anywhere;
// - `walk_progress` in [0, 1]: how far along the straight line it is.
//
// The rendered position is `position.lerp(target, walk_progress)`
// (`current_position`). Progress grows by `walk_step × work_speed` per tick,
// so every walk takes the same number of ticks regardless of distance, and
// a grumpy villager walks as slowly as it builds. On arrival the villager
// snaps onto the target and the target is cleared (`snap_to_target`).
// Militia on the hunt move continuously instead: they have no target and
// their `position` is stepped directly.
//
// `assignment` holds at most one work site, a building or a node, so a
// villager can never be committed to both. An assigned villager is on site
// once it has no target left to walk to (`is_on_site`).
//
// Wanderers are generated here too: a two-part name built from steampunk
// name fragments, a random role and a random personality.
//
// See also: `sim/agents.rs` for mood ticks and player mood actions,
// `sim/construction.rs` and `sim/harvest.rs` for assignment.

use crate::config::VillagerConfig;
use crate::mood::{Mood, Personality};
use crate::prng::GameRng;
use crate::types::{BuildingId, CellCoord, EnemyId, NodeId, Point, Role, VillagerId};
use serde::{Deserialize, Serialize};

/// The one work site a villager can be committed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Building(BuildingId),
    Node(NodeId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Villager {
    pub id: VillagerId,
    pub name: String,
    pub role: Role,
    pub personality: Personality,
    pub mood: Mood,
    pub position: Point,
    pub home: Point,
    pub target: Option<Point>,
    pub walk_progress: f32,
    /// Ticks until the next personality-driven mood roll.
    pub mood_timer: u32,
    /// Player negotiation attempts so far. Never reset.
    pub negotiation_count: u32,
    /// Ticks of rest left; 0 when not resting.
    pub rest_timer: u32,
    pub health: f32,
    pub max_health: f32,
    pub is_militia: bool,
    pub feud_target: Option<VillagerId>,
    pub assignment: Option<Assignment>,
    /// Ticks until the next extraction while harvesting on site.
    pub harvest_timer: u32,
    /// Explicit enemy the player rallied this militia villager against.
    pub rally_target: Option<EnemyId>,
    /// Ticks until a militia villager can strike again.
    pub attack_cooldown: u32,
    /// Running home after being hit.
    pub fleeing: bool,
}

impl Villager {
    pub fn new(
        id: VillagerId,
        name: String,
        role: Role,
        personality: Personality,
        cell: CellCoord,
        config: &VillagerConfig,
        mood_timer: u32,
    ) -> Self {
        let home = cell.center();
        Self {
            id,
            name,
            role,
            personality,
            mood: Mood::Happy,
            position: home,
            home,
            target: None,
            walk_progress: 0.0,
            mood_timer,
            negotiation_count: 0,
            rest_timer: 0,
            health: config.max_health,
            max_health: config.max_health,
            is_militia: false,
            feud_target: None,
            assignment: None,
            harvest_timer: 0,
            rally_target: None,
            attack_cooldown: 0,
            fleeing: false,
        }
    }

    /// Where the villager is right now, mid-walk included.
    pub fn current_position(&self) -> Point {
        match self.target {
            Some(target) => self.position.lerp(target, self.walk_progress),
            None => self.position,
        }
    }

    pub fn is_resting(&self) -> bool {
        self.rest_timer > 0
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn assigned_building(&self) -> Option<BuildingId> {
        match self.assignment {
            Some(Assignment::Building(id)) => Some(id),
            _ => None,
        }
    }

    pub fn assigned_node(&self) -> Option<NodeId> {
        match self.assignment {
            Some(Assignment::Node(id)) => Some(id),
            _ => None,
        }
    }

    /// Committed to a work site and done walking to it.
    pub fn is_on_site(&self) -> bool {
        self.assignment.is_some() && self.target.is_none()
    }

    pub fn has_arrived(&self) -> bool {
        self.target.is_some() && self.walk_progress >= 1.0
    }

    /// Start walking from wherever the villager currently is.
    pub fn walk_to(&mut self, destination: Point) {
        self.position = self.current_position();
        self.target = Some(destination);
        self.walk_progress = 0.0;
    }

    pub fn advance_walk(&mut self, step: f32) {
        if self.target.is_some() && self.walk_progress < 1.0 {
            self.walk_progress = (self.walk_progress + step).min(1.0);
        }
    }

    /// Settle onto the current target, clearing it.
    pub fn snap_to_target(&mut self) {
        if let Some(target) = self.target.take() {
            self.position = target;
        }
        self.walk_progress = 0.0;
        self.fleeing = false;
    }

    /// Stop mid-walk where the villager stands.
    pub fn halt(&mut self) {
        self.position = self.current_position();
        self.target = None;
        self.walk_progress = 0.0;
    }

    /// Drop any assignment and walk home.
    pub fn release_home(&mut self) {
        self.assignment = None;
        self.harvest_timer = 0;
        self.walk_to(self.home);
    }

    /// Run home after taking a hit. Does nothing if already on the way home
    /// or standing there.
    pub fn flee_home(&mut self) {
        if self.fleeing || self.current_position() == self.home {
            return;
        }
        self.fleeing = true;
        self.walk_to(self.home);
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }
}

/// Draw a fresh mood timer.
pub fn roll_mood_timer(config: &VillagerConfig, rng: &mut GameRng) -> u32 {
    if config.mood_timer_max > config.mood_timer_min {
        rng.range_u32(config.mood_timer_min, config.mood_timer_max)
    } else {
        config.mood_timer_min.max(1)
    }
}

// ---------------------------------------------------------------------------
// Wanderers
// ---------------------------------------------------------------------------

/// A newcomer waiting at the village edge for the player's verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wanderer {
    pub name: String,
    pub role: Role,
    pub personality: Personality,
}

const GIVEN_NAMES: &[&str] = &[
    "ada", "bram", "cora", "dorian", "edith", "felix", "greta", "horace", "ivy", "jasper",
    "lettice", "mortimer", "nell", "oswin", "prudence", "quill", "rosalind", "silas", "tabitha",
    "wendell",
];

const SURNAME_HEADS: &[&str] = &[
    "cog", "brass", "steam", "iron", "copper", "gear", "spark", "rivet", "boiler", "piston",
];

const SURNAME_TAILS: &[&str] = &[
    "worth", "wright", "smith", "hammer", "field", "ton", "clad", "well", "forge", "spindle",
];

/// Generate a deterministic "Given Surname" name.
pub fn generate_name(rng: &mut GameRng) -> String {
    let given = rng.pick(GIVEN_NAMES).copied().unwrap_or("nobody");
    let head = rng.pick(SURNAME_HEADS).copied().unwrap_or("cog");
    let tail = rng.pick(SURNAME_TAILS).copied().unwrap_or("worth");
    format!("{} {}", capitalize(given), capitalize(&format!("{head}{tail}")))
}

pub fn generate_wanderer(rng: &mut GameRng) -> Wanderer {
    let name = generate_name(rng);
    let role = rng.pick(&Role::ALL).copied().unwrap_or(Role::Tinkerer);
    let personality = rng
        .pick(&Personality::ALL)
        .copied()
        .unwrap_or(Personality::Diligent);
    Wanderer {
        name,
        role,
        personality,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => {
            let upper: String = c.to_uppercase().collect();
            format!("{}{}", upper, chars.as_str())
        }
    }
}
