// Resource nodes: finite, depleting world deposits and raider outposts.
//
// A `ResourceNode` sits on one grid cell and holds `remaining` units of its
// resource, between 0 and `max`. Harvesting villagers stand on an adjacent
// cell and extract `amount_per_harvest` (or whatever is left) every harvest
// period.
//
// A node is in exactly one of two states:
// - available: `respawn_timer == 0` and `remaining > 0`;
// - respawning: `respawn_timer > 0` and `remaining == 0`. It cannot be
//   assigned or harvested, and refills to `max` when the timer runs out.
//
// Outposts are hostile nodes. They never respawn: once a militia siege
// drains them they are removed from the world for good, paying out the
// configured bounty.
//
// See also: `sim/harvest.rs` for extraction, respawn and sieges.

use crate::types::{CellCoord, NodeId, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Timber,
    Stone,
    Metal,
    Water,
    Outpost,
}

impl NodeKind {
    /// Every kind a plot can roll as an ordinary deposit.
    pub const HARVESTABLE: [NodeKind; 4] =
        [NodeKind::Timber, NodeKind::Stone, NodeKind::Metal, NodeKind::Water];

    pub fn is_outpost(self) -> bool {
        self == NodeKind::Outpost
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Timber => "Ancient Timbers",
            NodeKind::Stone => "Obsidian Outcrop",
            NodeKind::Metal => "Iron Vein",
            NodeKind::Water => "Steam Vent",
            NodeKind::Outpost => "Raider Outpost",
        };
        f.write_str(name)
    }
}

/// Static data for one node kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub resource: Resource,
    /// Units extracted per harvest. Ignored for outposts, which are sieged.
    pub amount_per_harvest: f64,
    pub max_amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub cell: CellCoord,
    pub resource: Resource,
    pub amount_per_harvest: f64,
    pub remaining: f64,
    pub max: f64,
    /// Ticks until refill. Non-zero only while depleted.
    pub respawn_timer: u32,
}

impl ResourceNode {
    pub fn new(id: NodeId, kind: NodeKind, cell: CellCoord, def: &NodeDef) -> Self {
        Self {
            id,
            kind,
            cell,
            resource: def.resource,
            amount_per_harvest: def.amount_per_harvest,
            remaining: def.max_amount,
            max: def.max_amount,
            respawn_timer: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.respawn_timer == 0 && self.remaining > 0.0
    }

    pub fn is_respawning(&self) -> bool {
        self.respawn_timer > 0
    }

    /// Take one harvest's worth. Returns the amount taken, never more than
    /// what is left.
    pub fn extract(&mut self) -> f64 {
        if !self.is_available() {
            return 0.0;
        }
        let taken = self.amount_per_harvest.min(self.remaining).max(0.0);
        self.remaining = (self.remaining - taken).max(0.0);
        taken
    }

    /// Enter the respawning state.
    pub fn begin_respawn(&mut self, ticks: u32) {
        self.remaining = 0.0;
        self.respawn_timer = ticks.max(1);
    }

    /// Advance the respawn countdown by one tick. Returns true on the tick the
    /// node refills.
    pub fn tick_respawn(&mut self) -> bool {
        if self.respawn_timer == 0 {
            return false;
        }
        self.respawn_timer -= 1;
        if self.respawn_timer == 0 {
            self.remaining = self.max;
            true
        } else {
            false
        }
    }

    /// Apply siege damage. Returns true when the outpost has fallen.
    pub fn take_siege_damage(&mut self, damage: f64) -> bool {
        self.remaining = (self.remaining - damage.max(0.0)).max(0.0);
        self.remaining <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timber(remaining: f64) -> ResourceNode {
        let def = NodeDef {
            resource: Resource::Wood,
            amount_per_harvest: 8.0,
            max_amount: 120.0,
        };
        let mut node = ResourceNode::new(NodeId(1), NodeKind::Timber, CellCoord::new(1, 1), &def);
        node.remaining = remaining;
        node
    }

    #[test]
    fn extract_never_takes_more_than_remaining() {
        let mut node = timber(5.0);
        assert_eq!(node.extract(), 5.0);
        assert_eq!(node.remaining, 0.0);
        assert_eq!(node.extract(), 0.0);
    }

    #[test]
    fn respawn_refills_after_exact_duration() {
        let mut node = timber(0.0);
        node.begin_respawn(3);
        assert!(!node.is_available());
        assert!(!node.tick_respawn());
        assert!(!node.tick_respawn());
        assert!(node.tick_respawn());
        assert_eq!(node.remaining, node.max);
        assert!(node.is_available());
    }

    #[test]
    fn respawning_node_yields_nothing() {
        let mut node = timber(40.0);
        node.begin_respawn(10);
        assert_eq!(node.remaining, 0.0);
        assert_eq!(node.extract(), 0.0);
    }

    #[test]
    fn siege_damage_clamps_at_zero() {
        let mut node = timber(10.0);
        assert!(!node.take_siege_damage(6.0));
        assert!(node.take_siege_damage(6.0));
        assert_eq!(node.remaining, 0.0);
    }
}
