// Player actions and their results.
//
// All player-driven mutation goes through a `SimAction`. Each action is a
// reducer over the world snapshot: `SimState::apply` validates it, and on
// success mutates the world and returns an `ActionOutcome`; on failure it
// returns an `ActionError` and leaves the world untouched. `SimState::reduce`
// wraps the same thing as a pure `(world, action) -> world'` function.
//
// Rejections are ordinary values, not panics. Every `ActionError` has a
// stable snake_case code (`reason()`) that UIs and saves can key on.
// A refusal is a game mechanic rather than an error in the engine, but it is
// reported through the same channel so the caller sees `refused` and the
// villager's mood.
//
// See also: `sim/mod.rs` for the dispatcher, `sim/construction.rs`,
// `sim/agents.rs`, `sim/harvest.rs`, `sim/combat.rs` and
// `sim/population.rs` for the handlers.

use crate::building::BuildingKind;
use crate::mood::Mood;
use crate::types::{BuildingId, CellCoord, EnemyId, NodeId, PlotCoord, VillagerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A player action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimAction {
    PlaceBuilding { kind: BuildingKind, cell: CellCoord },
    AssignVillager { building: BuildingId, villager: VillagerId },
    AssignVillagerToNode { node: NodeId, villager: VillagerId },
    UnassignVillager { villager: VillagerId },
    NegotiateWithVillager { villager: VillagerId },
    WorsenVillagerMood { villager: VillagerId },
    BribeVillager { villager: VillagerId },
    RestVillager { villager: VillagerId },
    UpgradeBuilding { building: BuildingId },
    ActivateTradeBoost { building: BuildingId },
    UnlockPlot { plot: PlotCoord },
    SetMilitia { villager: VillagerId, enlisted: bool },
    RallyMilitiaTo { enemy: EnemyId },
    AcceptWanderer,
    RejectWanderer,
}

/// What a successful action did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Placed { building: BuildingId },
    /// The villager accepted and is walking to `work_cell`.
    Assigned { work_cell: CellCoord },
    Unassigned,
    /// A mood action ran. `from == to` when the mood was already at the end
    /// of its chain.
    MoodChanged { from: Mood, to: Mood },
    Resting { ticks: u32 },
    Upgraded { level: u32 },
    BoostStarted { ticks: u32 },
    PlotUnlocked { nodes: usize },
    MilitiaSet { enlisted: bool },
    Rallied { count: usize },
    WandererAccepted { villager: VillagerId },
    WandererRejected,
}

/// Why an action was rejected. Apart from a `Refused` roll, which is
/// chronicled, the world is left unchanged.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActionError {
    #[error("building is not awaiting a worker")]
    NotProposed,
    #[error("no such villager")]
    NoVillager,
    #[error("villager is busy constructing another building")]
    AlreadyBusy,
    #[error("villager is resting")]
    Resting,
    #[error("villager refused ({mood})")]
    Refused { mood: Mood },
    #[error("node is depleted")]
    NodeEmpty,
    #[error("not enough resources")]
    NoFunds,
    #[error("no such building")]
    UnknownBuilding,
    #[error("no such node")]
    UnknownNode,
    #[error("no such enemy")]
    UnknownEnemy,
    #[error("cell is outside the unlocked plots")]
    InvalidCell,
    #[error("cell is occupied")]
    CellOccupied,
    #[error("no free cell next to the work site")]
    NoOpenCell,
    #[error("building is not active")]
    NotActive,
    #[error("outposts can only be assigned militia")]
    NotMilitia,
    #[error("trade boost is not ready")]
    BoostUnavailable,
    #[error("no wanderer is waiting")]
    NoPendingWanderer,
    #[error("plot cannot be unlocked")]
    PlotUnavailable,
    #[error("the village has fallen")]
    GameOver,
}

impl ActionError {
    /// Stable snake_case reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            ActionError::NotProposed => "not_proposed",
            ActionError::NoVillager => "no_villager",
            ActionError::AlreadyBusy => "already_busy",
            ActionError::Resting => "resting",
            ActionError::Refused { .. } => "refused",
            ActionError::NodeEmpty => "node_empty",
            ActionError::NoFunds => "no_funds",
            ActionError::UnknownBuilding => "unknown_building",
            ActionError::UnknownNode => "unknown_node",
            ActionError::UnknownEnemy => "unknown_enemy",
            ActionError::InvalidCell => "invalid_cell",
            ActionError::CellOccupied => "cell_occupied",
            ActionError::NoOpenCell => "no_open_cell",
            ActionError::NotActive => "not_active",
            ActionError::NotMilitia => "not_militia",
            ActionError::BoostUnavailable => "boost_unavailable",
            ActionError::NoPendingWanderer => "no_pending_wanderer",
            ActionError::PlotUnavailable => "plot_unavailable",
            ActionError::GameOver => "game_over",
        }
    }
}
