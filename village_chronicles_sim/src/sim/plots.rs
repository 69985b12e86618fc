// World seeding and plot expansion.
//
// The world is a sparse grid of 8x8 plots. A new world starts with the home
// plot (0, 0) unlocked, one deposit of every harvestable kind on it, and the
// configured starting villagers at their cells. Seeding writes no chronicle
// entries: the log starts empty.
//
// `unlock_plot` grows the settlement by one plot bordering an unlocked one.
// The price rises with every plot already owned. Each new plot gets
// `nodes_per_plot` random deposits and, with `outpost_chance`, a raider
// outpost.
//
// Node cells are drawn with the sim's RNG from the plot's free cells, so
// seeding is reproducible from the seed alone.

use super::SimState;
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::grid::CellRef;
use crate::node::{NodeKind, ResourceNode};
use crate::types::{CellCoord, NodeId, PlotCoord, Resource};
use crate::villager::{Villager, roll_mood_timer};
use tracing::{debug, info};

pub(super) const HOME_PLOT: PlotCoord = PlotCoord::new(0, 0);

impl SimState {
    pub(super) fn seed_world(&mut self) {
        self.grid.unlock_plot(HOME_PLOT);

        let reserved: Vec<CellCoord> = self
            .config
            .world
            .starting_villagers
            .iter()
            .map(|s| s.cell)
            .collect();
        for kind in NodeKind::HARVESTABLE {
            let free: Vec<CellCoord> = self
                .grid
                .free_cells_in(HOME_PLOT)
                .into_iter()
                .filter(|c| !reserved.contains(c))
                .collect();
            if let Some(&cell) = self.rng.pick(&free) {
                self.spawn_node(kind, cell);
            }
        }

        let starters = self.config.world.starting_villagers.clone();
        for s in starters {
            let id = self.ids.villager();
            let timer = roll_mood_timer(&self.config.villager, &mut self.rng);
            let villager = Villager::new(
                id,
                s.name,
                s.role,
                s.personality,
                s.cell,
                &self.config.villager,
                timer,
            );
            self.villagers.insert(id, villager);
        }
        debug!(
            nodes = self.nodes.len(),
            villagers = self.villagers.len(),
            "world seeded"
        );
    }

    /// Place a new node on `cell`. Returns `None` if the cell is taken or
    /// the kind has no definition.
    pub(super) fn spawn_node(&mut self, kind: NodeKind, cell: CellCoord) -> Option<NodeId> {
        let def = self.config.nodes.get(&kind)?;
        if !self.grid.is_free(cell) {
            return None;
        }
        let id = self.ids.node();
        let node = ResourceNode::new(id, kind, cell, def);
        self.grid.occupy(cell, CellRef::Node(id));
        self.nodes.insert(id, node);
        Some(id)
    }

    pub fn unlock_plot(&mut self, plot: PlotCoord) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        if self.grid.is_unlocked(plot) || !self.grid.borders_unlocked(plot) {
            return Err(ActionError::PlotUnavailable);
        }
        let cost = self.config.world.plot_unlock_cost * self.grid.plot_count() as f64;
        self.ledger
            .try_spend(Resource::Gears, cost)
            .map_err(|_| ActionError::NoFunds)?;
        self.grid.unlock_plot(plot);

        let mut placed = 0;
        for _ in 0..self.config.world.nodes_per_plot {
            let Some(&kind) = self.rng.pick(&NodeKind::HARVESTABLE) else {
                break;
            };
            if self.scatter_node(plot, kind).is_some() {
                placed += 1;
            }
        }
        if self.rng.chance(self.config.world.outpost_chance)
            && self.scatter_node(plot, NodeKind::Outpost).is_some()
        {
            placed += 1;
        }

        self.record(ChronicleKey::PlotUnlocked, &[], None);
        info!(%plot, cost, nodes = placed, "plot unlocked");
        Ok(ActionOutcome::PlotUnlocked { nodes: placed })
    }

    fn scatter_node(&mut self, plot: PlotCoord, kind: NodeKind) -> Option<NodeId> {
        let free = self.grid.free_cells_in(plot);
        let cell = *self.rng.pick(&free)?;
        self.spawn_node(kind, cell)
    }
}

#[cfg(test)]
mod tests {
    use super::HOME_PLOT;
    use crate::command::{ActionError, ActionOutcome};
    use crate::node::NodeKind;
    use crate::sim::SimState;
    use crate::types::{PlotCoord, Resource};

    #[test]
    fn home_plot_has_one_node_of_each_kind() {
        let sim = SimState::new(42);
        for kind in NodeKind::HARVESTABLE {
            assert_eq!(sim.nodes.values().filter(|n| n.kind == kind).count(), 1);
        }
        for node in sim.nodes.values() {
            assert_eq!(node.cell.plot(), HOME_PLOT);
            assert!(sim.villagers.values().all(|v| v.home != node.cell.center()));
        }
        assert!(sim.chronicle.is_empty());
    }

    #[test]
    fn seeding_depends_only_on_the_seed() {
        let a = SimState::new(9);
        let b = SimState::new(9);
        let cells = |s: &SimState| s.nodes.values().map(|n| n.cell).collect::<Vec<_>>();
        assert_eq!(cells(&a), cells(&b));
    }

    #[test]
    fn unlock_requires_a_bordering_plot() {
        let mut sim = SimState::new(42);
        assert_eq!(
            sim.unlock_plot(PlotCoord::new(2, 0)).unwrap_err(),
            ActionError::PlotUnavailable
        );
        assert_eq!(sim.unlock_plot(HOME_PLOT).unwrap_err(), ActionError::PlotUnavailable);
    }

    #[test]
    fn unlock_price_grows_with_owned_plots() {
        let mut sim = SimState::new(42);
        sim.config.world.outpost_chance = 0.0;
        sim.ledger.credit(Resource::Gears, 200.0);
        let out = sim.unlock_plot(PlotCoord::new(1, 0)).unwrap();
        assert_eq!(out, ActionOutcome::PlotUnlocked { nodes: 3 });
        assert_eq!(sim.ledger.get(Resource::Gears), 200.0);
        assert_eq!(
            sim.unlock_plot(PlotCoord::new(2, 0)).unwrap(),
            ActionOutcome::PlotUnlocked { nodes: 3 }
        );
        assert_eq!(sim.ledger.get(Resource::Gears), 0.0);
        assert_eq!(sim.unlock_plot(PlotCoord::new(0, 1)).unwrap_err(), ActionError::NoFunds);
        assert_eq!(sim.nodes.len(), 10);
    }

    #[test]
    fn certain_outpost_chance_always_adds_one() {
        let mut sim = SimState::new(42);
        sim.config.world.outpost_chance = 1.0;
        sim.unlock_plot(PlotCoord::new(0, -1)).unwrap();
        let outposts: Vec<_> = sim.nodes.values().filter(|n| n.kind.is_outpost()).collect();
        assert_eq!(outposts.len(), 1);
        assert_eq!(outposts[0].cell.plot(), PlotCoord::new(0, -1));
    }
}
