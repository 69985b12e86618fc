// Core types shared across the simulation.
//
// Defines the two coordinate spaces of the settlement, the strongly-typed
// entity IDs, the id allocator, and small enums (`Resource`, `Role`) that
// several modules need.
//
// ## Coordinates
//
// - `CellCoord` is an integer grid cell. Buildings and resource nodes occupy
//   exactly one cell. X grows east, Y grows south.
// - `PlotCoord` is an 8x8 chunk of cells. Cells are only buildable inside an
//   unlocked plot (see `grid.rs`).
// - `Point` is a continuous position measured in cells. Villagers interpolate
//   between points while walking, and enemies/militia move along straight
//   lines in this space. A cell's center is the point `(x, y)`.
//
// ## Entity IDs
//
// IDs are monotonically allocated `u64`s wrapped in per-kind newtypes. The
// allocator lives in the snapshot, so the next id survives a save. On restore
// it is reseated above the largest id present (`save.rs`).
//
// **Critical constraint: determinism.** No hashing, no wall clock. All maps
// keyed by these types are `BTreeMap`s.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Grid coordinates
// ---------------------------------------------------------------------------

/// Side length of a plot, in cells.
pub const PLOT_SIZE: i32 = 8;

/// A cell on the settlement grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four orthogonal neighbors in work-site search order:
    /// south, east, west, north.
    pub fn work_site_candidates(self) -> [CellCoord; 4] {
        [
            CellCoord::new(self.x, self.y + 1),
            CellCoord::new(self.x + 1, self.y),
            CellCoord::new(self.x - 1, self.y),
            CellCoord::new(self.x, self.y - 1),
        ]
    }

    /// The plot this cell belongs to.
    pub fn plot(self) -> PlotCoord {
        PlotCoord::new(self.x.div_euclid(PLOT_SIZE), self.y.div_euclid(PLOT_SIZE))
    }

    /// Center of the cell in continuous space.
    pub fn center(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An 8x8 chunk of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotCoord {
    pub x: i32,
    pub y: i32,
}

impl PlotCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Top-left (north-west) cell of the plot.
    pub fn origin(self) -> CellCoord {
        CellCoord::new(self.x * PLOT_SIZE, self.y * PLOT_SIZE)
    }

    /// All 64 cells of the plot, row by row.
    pub fn cells(self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin();
        (0..PLOT_SIZE).flat_map(move |dy| {
            (0..PLOT_SIZE).map(move |dx| CellCoord::new(origin.x + dx, origin.y + dy))
        })
    }

    /// The cells along the plot's outer edge. Raiders enter from here.
    pub fn edge_cells(self) -> Vec<CellCoord> {
        self.cells()
            .filter(|c| {
                let local_x = c.x - self.x * PLOT_SIZE;
                let local_y = c.y - self.y * PLOT_SIZE;
                local_x == 0 || local_y == 0 || local_x == PLOT_SIZE - 1 || local_y == PLOT_SIZE - 1
            })
            .collect()
    }

    /// Orthogonal neighbor plots.
    pub fn neighbors(self) -> [PlotCoord; 4] {
        [
            PlotCoord::new(self.x, self.y + 1),
            PlotCoord::new(self.x + 1, self.y),
            PlotCoord::new(self.x - 1, self.y),
            PlotCoord::new(self.x, self.y - 1),
        ]
    }
}

impl fmt::Display for PlotCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plot({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Continuous positions
// ---------------------------------------------------------------------------

/// A continuous position in cell units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Point, t: f32) -> Point {
        let t = t.clamp(0.0, 1.0);
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Move up to `max_step` toward `target` along a straight line, stopping
    /// exactly on it rather than overshooting.
    pub fn step_toward(self, target: Point, max_step: f32) -> Point {
        let dist = self.distance(target);
        if dist <= max_step || dist <= f32::EPSILON {
            return target;
        }
        let t = max_step / dist;
        Point::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }

    /// The grid cell whose center is nearest to this point.
    pub fn nearest_cell(self) -> CellCoord {
        CellCoord::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Strongly-typed entity IDs
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

entity_id!(/// Unique identifier for a building.
BuildingId);
entity_id!(/// Unique identifier for a villager.
VillagerId);
entity_id!(/// Unique identifier for a resource node or outpost.
NodeId);
entity_id!(/// Unique identifier for a raider.
EnemyId);
entity_id!(/// Unique identifier for a chronicle entry.
ChronicleId);

/// Monotonic id counters, one per entity kind. Each value is the next id
/// that will be handed out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    pub next_building: u64,
    pub next_villager: u64,
    pub next_node: u64,
    pub next_enemy: u64,
    pub next_chronicle: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_building: 1,
            next_villager: 1,
            next_node: 1,
            next_enemy: 1,
            next_chronicle: 1,
        }
    }
}

impl IdAllocator {
    pub fn building(&mut self) -> BuildingId {
        let id = BuildingId(self.next_building);
        self.next_building += 1;
        id
    }

    pub fn villager(&mut self) -> VillagerId {
        let id = VillagerId(self.next_villager);
        self.next_villager += 1;
        id
    }

    pub fn node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn enemy(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy);
        self.next_enemy += 1;
        id
    }

    pub fn chronicle(&mut self) -> ChronicleId {
        let id = ChronicleId(self.next_chronicle);
        self.next_chronicle += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Simulation enums
// ---------------------------------------------------------------------------

/// A named counter in the resource ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Stone,
    Metal,
    Water,
    Gears,
    Steam,
    Crystals,
    Blueprints,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Wood,
        Resource::Stone,
        Resource::Metal,
        Resource::Water,
        Resource::Gears,
        Resource::Steam,
        Resource::Crystals,
        Resource::Blueprints,
    ];
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Wood => "wood",
            Resource::Stone => "stone",
            Resource::Metal => "metal",
            Resource::Water => "water",
            Resource::Gears => "gears",
            Resource::Steam => "steam",
            Resource::Crystals => "crystals",
            Resource::Blueprints => "blueprints",
        };
        f.write_str(name)
    }
}

/// A villager's trade. Flavor for chronicles and dialogue; it does not
/// change simulation rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Engineer,
    Alchemist,
    Merchant,
    Tinkerer,
    Stoker,
    Scout,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Engineer,
        Role::Alchemist,
        Role::Merchant,
        Role::Tinkerer,
        Role::Stoker,
        Role::Scout,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
