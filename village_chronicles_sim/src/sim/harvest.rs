// Resource node harvesting, respawn and outpost sieges.
//
// A villager assigned to a deposit walks to a free cell next to it (same
// search order as construction sites). Once on site it extracts
// `min(amount_per_harvest, remaining)` every `harvest.period` ticks straight
// into the ledger. The harvest that empties a deposit sends every worker on
// it home and starts the respawn countdown. While respawning a node cannot be
// worked; when the countdown ends it refills to max.
//
// Outposts are never harvested. Militia assigned to an outpost gather next
// to it, and once `siege_quorum` of them are present at the same time they
// deal `siege_damage_per_attacker` each per tick. A fallen outpost pays out
// once and is removed from the world for good.
//
// Phases: `step_harvesters` runs in phase 1 after the villager step,
// `sweep_nodes` is phase 2, `resolve_sieges` is phase 6.

use super::SimState;
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::event::{SimEvent, SimEventKind};
use crate::grid::CellRef;
use crate::types::{NodeId, VillagerId};
use crate::villager::Assignment;
use tracing::{debug, info};

impl SimState {
    // -----------------------------------------------------------------------
    // Player action
    // -----------------------------------------------------------------------

    pub fn assign_villager_to_node(
        &mut self,
        node_id: NodeId,
        villager_id: VillagerId,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let node = self.nodes.get(&node_id).ok_or(ActionError::UnknownNode)?;
        if !node.is_available() {
            return Err(ActionError::NodeEmpty);
        }
        let (kind, site) = (node.kind, node.cell);
        let villager = self
            .villagers
            .get(&villager_id)
            .ok_or(ActionError::NoVillager)?;
        if kind.is_outpost() && !villager.is_militia {
            return Err(ActionError::NotMilitia);
        }
        self.check_available(villager_id)?;
        let work_cell = self.find_work_cell(site).ok_or(ActionError::NoOpenCell)?;
        self.roll_refusal(villager_id, &kind.to_string(), None)?;

        self.release_assignment(villager_id);
        let period = self.config.harvest.period.max(1);
        let Some(v) = self.villagers.get_mut(&villager_id) else {
            return Err(ActionError::NoVillager);
        };
        v.assignment = Some(Assignment::Node(node_id));
        v.harvest_timer = period;
        v.rally_target = None;
        v.walk_to(work_cell.center());
        debug!(node = %node_id, villager = %villager_id, %kind, %work_cell, "worker sent to node");
        Ok(ActionOutcome::Assigned { work_cell })
    }

    // -----------------------------------------------------------------------
    // Phase 1: extraction
    // -----------------------------------------------------------------------

    pub(super) fn step_harvesters(&mut self, events: &mut Vec<SimEvent>) {
        let workers: Vec<(VillagerId, NodeId)> = self
            .villagers
            .values()
            .filter_map(|v| v.assigned_node().map(|n| (v.id, n)))
            .collect();
        let period = self.config.harvest.period.max(1);

        for (vid, nid) in workers {
            let Some(node) = self.nodes.get(&nid) else {
                self.send_home(vid);
                continue;
            };
            if node.kind.is_outpost() {
                continue;
            }
            // Respawning, possibly emptied by another worker earlier this tick.
            if !node.is_available() {
                self.send_home(vid);
                continue;
            }

            let Some(v) = self.villagers.get_mut(&vid) else {
                continue;
            };
            if v.has_arrived() {
                v.snap_to_target();
                v.harvest_timer = period;
                continue;
            }
            if !v.is_on_site() {
                continue;
            }
            v.harvest_timer = v.harvest_timer.saturating_sub(1);
            if v.harvest_timer > 0 {
                continue;
            }
            v.harvest_timer = period;

            let Some(node) = self.nodes.get_mut(&nid) else {
                continue;
            };
            let amount = node.extract();
            let resource = node.resource;
            let depleted = node.remaining <= 0.0;
            self.ledger.credit(resource, amount);
            self.emit(
                events,
                SimEventKind::Harvested {
                    node: nid,
                    villager: vid,
                    resource,
                    amount,
                },
            );
            if depleted {
                self.deplete_node(nid, events);
            }
        }
    }

    fn deplete_node(&mut self, id: NodeId, events: &mut Vec<SimEvent>) {
        let ticks = self.config.harvest.respawn_ticks;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.begin_respawn(ticks);
        }
        for vid in self.workers_on(id) {
            self.send_home(vid);
        }
        debug!(node = %id, ticks, "node depleted");
        self.emit(events, SimEventKind::NodeDepleted { node: id });
    }

    fn workers_on(&self, id: NodeId) -> Vec<VillagerId> {
        self.villagers
            .values()
            .filter(|v| v.assigned_node() == Some(id))
            .map(|v| v.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Phase 2: respawn sweep and grid cleanup
    // -----------------------------------------------------------------------

    pub(super) fn sweep_nodes(&mut self, events: &mut Vec<SimEvent>) {
        let mut refilled = Vec::new();
        for node in self.nodes.values_mut() {
            if node.tick_respawn() {
                refilled.push(node.id);
            }
        }
        for node in refilled {
            self.emit(events, SimEventKind::NodeRespawned { node });
        }

        let (buildings, nodes) = (&self.buildings, &self.nodes);
        self.grid.retain(|cell, what| match what {
            CellRef::Building(id) => buildings
                .get(&id)
                .is_some_and(|b| b.cell == cell && !b.status.is_terminal()),
            CellRef::Node(id) => nodes.get(&id).is_some_and(|n| n.cell == cell),
        });
    }

    // -----------------------------------------------------------------------
    // Phase 6: outpost sieges
    // -----------------------------------------------------------------------

    pub(super) fn resolve_sieges(&mut self, events: &mut Vec<SimEvent>) {
        let outposts: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.kind.is_outpost())
            .map(|n| n.id)
            .collect();
        let quorum = self.config.combat.siege_quorum.max(1) as usize;

        for nid in outposts {
            let mut present = 0usize;
            for vid in self.workers_on(nid) {
                let Some(v) = self.villagers.get_mut(&vid) else {
                    continue;
                };
                if v.has_arrived() {
                    v.snap_to_target();
                }
                if v.is_on_site() && v.is_militia && v.is_alive() {
                    present += 1;
                }
            }
            if present < quorum {
                continue;
            }

            let damage = self.config.combat.siege_damage_per_attacker * present as f64;
            let Some(node) = self.nodes.get_mut(&nid) else {
                continue;
            };
            if node.take_siege_damage(damage) {
                self.fall_outpost(nid, events);
            }
        }
    }

    fn fall_outpost(&mut self, id: NodeId, events: &mut Vec<SimEvent>) {
        self.ledger.credit_bundle(&self.config.combat.outpost_payout);
        for vid in self.workers_on(id) {
            self.send_home(vid);
        }
        if let Some(node) = self.nodes.remove(&id) {
            self.grid.release(node.cell, CellRef::Node(id));
        }
        self.record(ChronicleKey::OutpostFallen, &[], None);
        info!(node = %id, "outpost fallen");
        self.emit(events, SimEventKind::OutpostFallen { node: id });
    }
}

#[cfg(test)]
mod tests {
    use crate::command::{ActionError, ActionOutcome};
    use crate::node::NodeKind;
    use crate::sim::SimState;
    use crate::types::{NodeId, PlotCoord, Resource, VillagerId};
    use crate::villager::Assignment;

    fn quiet_sim() -> SimState {
        let mut sim = SimState::new(42);
        sim.config.events.roll_chance = 0.0;
        sim.config.combat.grace_period = u64::MAX;
        for v in sim.villagers.values_mut() {
            v.mood_timer = u32::MAX;
        }
        sim
    }

    fn node_of(sim: &SimState, kind: NodeKind) -> NodeId {
        sim.nodes.values().find(|n| n.kind == kind).unwrap().id
    }

    fn villagers(sim: &SimState) -> Vec<VillagerId> {
        sim.villagers.keys().copied().collect()
    }

    /// Put a villager on site at `node` without walking there.
    fn station(sim: &mut SimState, vid: VillagerId, node: NodeId) {
        let cell = sim.nodes[&node].cell;
        let v = sim.villagers.get_mut(&vid).unwrap();
        v.assignment = Some(Assignment::Node(node));
        v.position = cell.work_site_candidates()[0].center();
        v.target = None;
        v.walk_progress = 0.0;
        v.harvest_timer = 1;
    }

    fn outpost(sim: &mut SimState, remaining: f64) -> NodeId {
        let cell = sim.grid.free_cells_in(PlotCoord::new(0, 0))[10];
        let id = sim.spawn_node(NodeKind::Outpost, cell).unwrap();
        sim.nodes.get_mut(&id).unwrap().remaining = remaining;
        id
    }

    #[test]
    fn harvester_walks_then_extracts_on_period() {
        let mut sim = quiet_sim();
        let timber = node_of(&sim, NodeKind::Timber);
        let v = villagers(&sim)[0];
        let out = sim.assign_villager_to_node(timber, v).unwrap();
        assert!(matches!(out, ActionOutcome::Assigned { .. }));
        let mut wood = Vec::new();
        for _ in 0..30 {
            sim.tick();
            wood.push(sim.ledger.get(Resource::Wood));
        }
        assert!(wood[9] == 0.0);
        assert_eq!(*wood.last().unwrap(), 32.0);
        assert_eq!(sim.nodes[&timber].remaining, 120.0 - 32.0);
    }

    #[test]
    fn last_harvest_depletes_and_starts_respawn() {
        let mut sim = quiet_sim();
        let timber = node_of(&sim, NodeKind::Timber);
        let v = villagers(&sim)[0];
        sim.nodes.get_mut(&timber).unwrap().remaining = 8.0;
        station(&mut sim, v, timber);

        let result = sim.tick();
        let harvests = result
            .events
            .iter()
            .filter(|e| matches!(e.kind, crate::event::SimEventKind::Harvested { .. }))
            .count();
        assert_eq!(harvests, 1);
        let node = &sim.nodes[&timber];
        assert_eq!(node.remaining, 0.0);
        assert!(node.is_respawning());
        assert!(sim.villagers[&v].assignment.is_none());
        assert_eq!(sim.ledger.get(Resource::Wood), 8.0);
    }

    #[test]
    fn respawning_node_rejects_workers_and_refills() {
        let mut sim = quiet_sim();
        let timber = node_of(&sim, NodeKind::Timber);
        let v = villagers(&sim)[0];
        sim.nodes.get_mut(&timber).unwrap().begin_respawn(3);
        assert_eq!(sim.assign_villager_to_node(timber, v).unwrap_err(), ActionError::NodeEmpty);
        sim.tick();
        sim.tick();
        assert!(sim.nodes[&timber].is_respawning());
        sim.tick();
        assert_eq!(sim.nodes[&timber].remaining, 120.0);
        assert!(sim.assign_villager_to_node(timber, v).is_ok());
    }

    #[test]
    fn outposts_take_militia_only() {
        let mut sim = quiet_sim();
        let post = outpost(&mut sim, 500.0);
        let v = villagers(&sim)[0];
        assert_eq!(sim.assign_villager_to_node(post, v).unwrap_err(), ActionError::NotMilitia);
        sim.set_militia(v, true).unwrap();
        assert!(sim.assign_villager_to_node(post, v).is_ok());
    }

    #[test]
    fn siege_below_quorum_does_nothing() {
        let mut sim = quiet_sim();
        let post = outpost(&mut sim, 10.0);
        for v in villagers(&sim).into_iter().take(2) {
            sim.villagers.get_mut(&v).unwrap().is_militia = true;
            station(&mut sim, v, post);
        }
        sim.tick();
        assert_eq!(sim.nodes[&post].remaining, 10.0);
    }

    #[test]
    fn three_militia_take_an_outpost_in_two_ticks() {
        let mut sim = quiet_sim();
        let post = outpost(&mut sim, 10.0);
        let cell = sim.nodes[&post].cell;
        for v in villagers(&sim) {
            sim.villagers.get_mut(&v).unwrap().is_militia = true;
            station(&mut sim, v, post);
        }
        sim.tick();
        assert_eq!(sim.nodes[&post].remaining, 4.0);
        sim.tick();
        assert!(!sim.nodes.contains_key(&post));
        assert!(sim.grid.is_free(cell));
        assert_eq!(sim.ledger.get(Resource::Crystals), 100.0);
        assert_eq!(sim.ledger.get(Resource::Blueprints), 10.0);
        assert!(sim.villagers.values().all(|v| v.assignment.is_none()));
    }
}
