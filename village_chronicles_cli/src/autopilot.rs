// A simple rule-based player for headless runs.
//
// Every time it is consulted the autopilot issues at most a handful of
// ordinary `SimAction`s through `SimState::apply`, exactly as a UI would:
// - take in any waiting wanderer;
// - draft a militia when raiders show up;
// - propose the next building it can afford on the home plot, keeping at
//   most one proposal open at a time;
// - put idle villagers to work, first on the open proposal or a stalled
//   construction site, then on the nearest open deposit, coaxing anyone who
//   refuses.
//
// It reads the snapshot but never mutates it directly, so a run with the
// autopilot is as deterministic as one without.

use village_chronicles_sim::building::{BuildingKind, BuildingStatus};
use village_chronicles_sim::command::{ActionError, ActionOutcome, SimAction};
use village_chronicles_sim::sim::{SimState, ThreatLevel};
use village_chronicles_sim::types::{PlotCoord, VillagerId};
use tracing::debug;

/// Build order. Kinds it cannot afford are skipped, not waited on.
const BUILD_ORDER: [BuildingKind; 8] = [
    BuildingKind::ClockworkForge,
    BuildingKind::SteamMill,
    BuildingKind::Cottage,
    BuildingKind::Watchtower,
    BuildingKind::CrystalRefinery,
    BuildingKind::TeslaCoil,
    BuildingKind::InventorsWorkshop,
    BuildingKind::AetherConduit,
];

const MILITIA_SIZE: usize = 2;

pub struct Autopilot {
    /// Consult the autopilot every this many ticks.
    pub every: u64,
    pub actions_taken: u64,
    pub actions_rejected: u64,
}

impl Autopilot {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            actions_taken: 0,
            actions_rejected: 0,
        }
    }

    pub fn is_due(&self, sim: &SimState) -> bool {
        sim.tick % self.every == 0
    }

    /// Look at the world and issue this round's actions.
    pub fn act(&mut self, sim: &mut SimState) {
        if sim.game_over {
            return;
        }
        if sim.pending_wanderer.is_some() {
            self.issue(sim, SimAction::AcceptWanderer);
        }
        self.staff_militia(sim);
        self.propose_next_building(sim);
        self.put_idle_to_work(sim);
    }

    fn issue(&mut self, sim: &mut SimState, action: SimAction) -> Option<ActionOutcome> {
        match sim.apply(&action) {
            Ok(outcome) => {
                self.actions_taken += 1;
                debug!(?action, ?outcome, "autopilot");
                Some(outcome)
            }
            Err(err) => {
                self.actions_rejected += 1;
                debug!(?action, reason = err.reason(), "autopilot action rejected");
                if let (ActionError::Refused { .. }, Some(villager)) = (&err, acted_on(&action)) {
                    self.issue(sim, SimAction::NegotiateWithVillager { villager });
                }
                None
            }
        }
    }

    fn idle_villagers(sim: &SimState) -> Vec<VillagerId> {
        sim.villagers
            .values()
            .filter(|v| v.is_alive() && !v.is_resting() && !v.is_militia)
            .filter(|v| v.assignment.is_none())
            .map(|v| v.id)
            .collect()
    }

    fn staff_militia(&mut self, sim: &mut SimState) {
        if sim.threat < ThreatLevel::Watchful {
            return;
        }
        let enlisted = sim.villagers.values().filter(|v| v.is_militia).count();
        let recruits: Vec<VillagerId> = Self::idle_villagers(sim)
            .into_iter()
            .take(MILITIA_SIZE.saturating_sub(enlisted))
            .collect();
        for villager in recruits {
            self.issue(
                sim,
                SimAction::SetMilitia {
                    villager,
                    enlisted: true,
                },
            );
        }
    }

    fn put_idle_to_work(&mut self, sim: &mut SimState) {
        for villager in Self::idle_villagers(sim) {
            let open_site = sim
                .buildings
                .values()
                .find(|b| match b.status {
                    BuildingStatus::Proposed => true,
                    BuildingStatus::Building => b.assigned_villager.is_none(),
                    _ => false,
                })
                .map(|b| b.id);
            if let Some(building) = open_site {
                self.issue(sim, SimAction::AssignVillager { building, villager });
                continue;
            }

            let Some(from) = sim.villagers.get(&villager).map(|v| v.current_position()) else {
                continue;
            };
            let node = sim
                .nodes
                .values()
                .filter(|n| n.is_available() && !n.kind.is_outpost())
                .min_by(|a, b| {
                    let (da, db) = (from.distance(a.cell.center()), from.distance(b.cell.center()));
                    da.total_cmp(&db)
                })
                .map(|n| n.id);
            if let Some(node) = node {
                self.issue(sim, SimAction::AssignVillagerToNode { node, villager });
            }
        }
    }

    fn propose_next_building(&mut self, sim: &mut SimState) {
        if sim
            .buildings
            .values()
            .any(|b| b.status == BuildingStatus::Proposed)
        {
            return;
        }
        let Some(&cell) = sim.grid.free_cells_in(PlotCoord::new(0, 0)).first() else {
            return;
        };
        let affordable = BUILD_ORDER.into_iter().find(|kind| {
            let already = sim.buildings.values().filter(|b| b.kind == *kind).count();
            let affordable = sim
                .config
                .building(*kind)
                .is_some_and(|def| sim.ledger.can_afford(&def.cost));
            affordable && already < 2
        });
        if let Some(kind) = affordable {
            self.issue(sim, SimAction::PlaceBuilding { kind, cell });
        }
    }
}

fn acted_on(action: &SimAction) -> Option<VillagerId> {
    match *action {
        SimAction::AssignVillager { villager, .. }
        | SimAction::AssignVillagerToNode { villager, .. } => Some(villager),
        _ => None,
    }
}
