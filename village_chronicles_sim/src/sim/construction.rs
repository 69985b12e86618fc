// Construction pipeline: placement, worker assignment, per-tick progress and
// building abilities.
//
// Player actions:
// - `place_building`: the cell must be inside an unlocked plot and empty, and
//   the cost affordable. On success the cost is debited and a `Proposed`
//   building appears.
// - `assign_villager`: the building must be `Proposed` (or under
//   construction with its worker gone, to resume it), the villager awake
//   and not mid-construction elsewhere. A refusal roll (the mood's refusal
//   chance, waived once the villager has been negotiated with
//   `mercy_threshold` times) can turn the request down. On acceptance any
//   earlier assignment is released and the villager walks to the first free
//   neighbor of the site in south, east, west, north order.
// - `upgrade_building`: costs `level × 3` blueprints; active buildings only.
// - `activate_trade_boost`: a ready trade booster doubles global production
//   for its duration, then recharges.
//
// Per tick (phase 3):
// - `Assigned` → `Building` when the worker arrives (snapped onto its cell).
// - `Building` counts its timer down by the worker's mood work speed while the
//   worker is on site, and pauses while it has none. At zero
//   the building turns `Active`, the worker walks home, and the completion
//   (and any milestone) is chronicled.
// - every `Active` building runs its ability hook. Yields go straight into
//   the ledger; volleys and vision zones are returned for the combat phase.

use super::SimState;
use crate::building::{AbilityEffect, AbilityEnv, Building, BuildingAbility, BuildingKind, BuildingStatus};
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::event::{SimEvent, SimEventKind};
use crate::grid::CellRef;
use crate::mood::Mood;
use crate::types::{BuildingId, CellCoord, PlotCoord, Resource, VillagerId};
use crate::villager::Assignment;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Blueprints per level an upgrade costs.
const UPGRADE_BLUEPRINTS_PER_LEVEL: f64 = 3.0;

impl SimState {
    // -----------------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------------

    pub fn place_building(
        &mut self,
        kind: BuildingKind,
        cell: CellCoord,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let def = self
            .config
            .buildings
            .get(&kind)
            .ok_or(ActionError::UnknownBuilding)?;
        if !self.grid.in_bounds(cell) {
            return Err(ActionError::InvalidCell);
        }
        if !self.grid.is_free(cell) {
            return Err(ActionError::CellOccupied);
        }
        self.ledger
            .try_debit(&def.cost)
            .map_err(|_| ActionError::NoFunds)?;

        let id = self.ids.building();
        let building = Building::new(id, kind, cell, def);
        self.grid.occupy(cell, CellRef::Building(id));
        self.buildings.insert(id, building);
        let name = kind.to_string();
        self.record(ChronicleKey::Proposed, &[("building", &name)], Some(kind));
        debug!(building = %id, %kind, %cell, "building proposed");
        Ok(ActionOutcome::Placed { building: id })
    }

    pub fn assign_villager(
        &mut self,
        building_id: BuildingId,
        villager_id: VillagerId,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let building = self
            .buildings
            .get(&building_id)
            .ok_or(ActionError::UnknownBuilding)?;
        let abandoned =
            building.status == BuildingStatus::Building && building.assigned_villager.is_none();
        if building.status != BuildingStatus::Proposed && !abandoned {
            return Err(ActionError::NotProposed);
        }
        let (kind, site) = (building.kind, building.cell);
        self.check_available(villager_id)?;
        let work_cell = self.find_work_cell(site).ok_or(ActionError::NoOpenCell)?;
        self.roll_refusal(villager_id, &kind.to_string(), Some(kind))?;

        self.release_assignment(villager_id);
        let Some(v) = self.villagers.get_mut(&villager_id) else {
            return Err(ActionError::NoVillager);
        };
        v.assignment = Some(Assignment::Building(building_id));
        v.rally_target = None;
        v.walk_to(work_cell.center());
        let name = v.name.clone();
        if let Some(b) = self.buildings.get_mut(&building_id) {
            if !abandoned {
                b.transition(BuildingStatus::Assigned);
            }
            b.assigned_villager = Some(villager_id);
        }
        self.record(
            ChronicleKey::Assigned,
            &[("villager", &name), ("building", &kind.to_string())],
            Some(kind),
        );
        debug!(building = %building_id, villager = %villager_id, %work_cell, "worker assigned");
        Ok(ActionOutcome::Assigned { work_cell })
    }

    pub fn upgrade_building(&mut self, id: BuildingId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let b = self.buildings.get(&id).ok_or(ActionError::UnknownBuilding)?;
        if !b.is_active() {
            return Err(ActionError::NotActive);
        }
        let cost = b.level as f64 * UPGRADE_BLUEPRINTS_PER_LEVEL;
        self.ledger
            .try_spend(Resource::Blueprints, cost)
            .map_err(|_| ActionError::NoFunds)?;
        let Some(b) = self.buildings.get_mut(&id) else {
            return Err(ActionError::UnknownBuilding);
        };
        b.level += 1;
        let (kind, level) = (b.kind, b.level);
        self.record(
            ChronicleKey::Upgrade,
            &[("building", &kind.to_string()), ("count", &level.to_string())],
            Some(kind),
        );
        info!(building = %id, %kind, level, "building upgraded");
        Ok(ActionOutcome::Upgraded { level })
    }

    pub fn activate_trade_boost(&mut self, id: BuildingId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let b = self.buildings.get(&id).ok_or(ActionError::UnknownBuilding)?;
        if !b.is_active() {
            return Err(ActionError::NotActive);
        }
        let Some(BuildingAbility::TradeBooster { duration, recharge }) =
            self.config.buildings.get(&b.kind).map(|d| &d.ability)
        else {
            return Err(ActionError::BoostUnavailable);
        };
        let (duration, recharge) = (*duration, *recharge);
        if b.cycle_timer > 0 || self.trade_boost_timer > 0 {
            return Err(ActionError::BoostUnavailable);
        }
        let kind = b.kind;
        if let Some(b) = self.buildings.get_mut(&id) {
            b.cycle_timer = duration + recharge;
        }
        self.trade_boost_timer = duration.max(1);
        self.record(ChronicleKey::TradeBoost, &[], Some(kind));
        info!(building = %id, ticks = duration, "trade boost started");
        Ok(ActionOutcome::BoostStarted { ticks: duration })
    }

    // -----------------------------------------------------------------------
    // Assignment helpers shared with node assignment
    // -----------------------------------------------------------------------

    /// The villager exists, is awake and is not mid-construction.
    pub(super) fn check_available(&self, id: VillagerId) -> Result<(), ActionError> {
        let v = self.villagers.get(&id).ok_or(ActionError::NoVillager)?;
        if v.is_resting() {
            return Err(ActionError::Resting);
        }
        if self.is_constructing(id) {
            return Err(ActionError::AlreadyBusy);
        }
        Ok(())
    }

    /// The villager is the worker of a site under construction.
    pub(super) fn is_constructing(&self, id: VillagerId) -> bool {
        self.villagers
            .get(&id)
            .and_then(|v| v.assigned_building())
            .and_then(|bid| self.buildings.get(&bid))
            .is_some_and(|b| b.status == BuildingStatus::Building && b.assigned_villager == Some(id))
    }

    /// First free neighbor of `site` in work-site search order.
    pub(super) fn find_work_cell(&self, site: CellCoord) -> Option<CellCoord> {
        site.work_site_candidates()
            .into_iter()
            .find(|c| self.grid.is_free(*c))
    }

    /// Roll the villager's refusal check. A refusal is chronicled and
    /// returned as an error; nothing else changes.
    pub(super) fn roll_refusal(
        &mut self,
        id: VillagerId,
        site_name: &str,
        building: Option<BuildingKind>,
    ) -> Result<(), ActionError> {
        let v = self.villagers.get(&id).ok_or(ActionError::NoVillager)?;
        if v.negotiation_count >= self.config.villager.mercy_threshold {
            return Ok(());
        }
        let mood = v.mood;
        let chance = self.config.mood(mood).refusal_chance;
        if !self.rng.chance(chance) {
            return Ok(());
        }
        let name = v.name.clone();
        self.record(
            ChronicleKey::Refusal,
            &[("villager", &name), ("building", site_name), ("mood", mood.label())],
            building,
        );
        debug!(villager = %id, %mood, "assignment refused");
        Err(ActionError::Refused { mood })
    }

    // -----------------------------------------------------------------------
    // Phase 3: progress, completion and abilities
    // -----------------------------------------------------------------------

    pub(super) fn step_buildings(&mut self, events: &mut Vec<SimEvent>) -> Vec<AbilityEffect> {
        let ids: Vec<BuildingId> = self.buildings.keys().copied().collect();
        for &id in &ids {
            self.progress_building(id, events);
        }

        let auras = self.aura_table();
        let global = self.production_multiplier();
        let mut effects = Vec::new();
        for id in ids {
            let Some(b) = self.buildings.get_mut(&id) else {
                continue;
            };
            if !b.is_active() {
                continue;
            }
            let Some(def) = self.config.buildings.get(&b.kind) else {
                continue;
            };
            let aura: f64 = auras
                .get(&b.cell.plot())
                .map(|sources| {
                    sources
                        .iter()
                        .filter(|(source, _)| *source != id)
                        .map(|(_, m)| *m)
                        .product()
                })
                .unwrap_or(1.0);
            let env = AbilityEnv {
                production_multiplier: global * aura,
            };
            match def.ability.on_tick(b, &env) {
                AbilityEffect::Idle => {}
                AbilityEffect::Yield(bundle) => self.ledger.credit_bundle(&bundle),
                effect => effects.push(effect),
            }
        }
        effects
    }

    /// Active aura sources per plot.
    fn aura_table(&self) -> BTreeMap<PlotCoord, Vec<(BuildingId, f64)>> {
        let mut auras: BTreeMap<PlotCoord, Vec<(BuildingId, f64)>> = BTreeMap::new();
        for b in self.buildings.values().filter(|b| b.is_active()) {
            let multiplier = self
                .config
                .buildings
                .get(&b.kind)
                .and_then(|d| d.ability.aura_multiplier());
            if let Some(m) = multiplier {
                auras.entry(b.cell.plot()).or_default().push((b.id, m));
            }
        }
        auras
    }

    fn progress_building(&mut self, id: BuildingId, events: &mut Vec<SimEvent>) {
        let Some(b) = self.buildings.get(&id) else {
            return;
        };
        let (status, kind) = (b.status, b.kind);
        let worker = b.assigned_villager;
        match status {
            BuildingStatus::Assigned => {
                let arrived = worker
                    .and_then(|w| self.villagers.get(&w))
                    .map(|v| v.has_arrived() || v.is_on_site());
                match arrived {
                    Some(true) => {
                        if let Some(v) = worker.and_then(|w| self.villagers.get_mut(&w)) {
                            v.snap_to_target();
                        }
                        if let Some(b) = self.buildings.get_mut(&id) {
                            b.transition(BuildingStatus::Building);
                        }
                        self.emit(events, SimEventKind::ConstructionStarted { building: id });
                    }
                    Some(false) => {}
                    None => self.orphan_building(id),
                }
            }
            BuildingStatus::Building => {
                let Some(v) = worker.and_then(|w| self.villagers.get_mut(&w)) else {
                    self.pause_building(id);
                    return;
                };
                // A worker resuming the site starts once it gets there.
                if !v.fleeing && v.target.is_some() {
                    if !v.has_arrived() {
                        return;
                    }
                    v.snap_to_target();
                }
                let mood = v.mood;
                let speed = self.config.mood(mood).work_speed;
                let Some(b) = self.buildings.get_mut(&id) else {
                    return;
                };
                b.construction_timer -= speed;
                if b.construction_timer <= 0.0 {
                    self.complete_building(id, kind, mood, events);
                }
            }
            BuildingStatus::Proposed | BuildingStatus::Active | BuildingStatus::Destroyed => {}
        }
    }

    /// A site whose worker vanished before arriving goes back to waiting
    /// for one.
    fn orphan_building(&mut self, id: BuildingId) {
        if let Some(b) = self.buildings.get_mut(&id) {
            b.assigned_villager = None;
            b.transition(BuildingStatus::Proposed);
        }
    }

    /// A site whose worker vanished mid-construction keeps its progress and
    /// stays under construction until someone is assigned to finish it.
    fn pause_building(&mut self, id: BuildingId) {
        if let Some(b) = self.buildings.get_mut(&id) {
            b.assigned_villager = None;
        }
    }

    fn complete_building(
        &mut self,
        id: BuildingId,
        kind: BuildingKind,
        mood: Mood,
        events: &mut Vec<SimEvent>,
    ) {
        let cycle = match self.config.buildings.get(&kind).map(|d| &d.ability) {
            Some(BuildingAbility::BlueprintGenerator { period, .. })
            | Some(BuildingAbility::Defense { period, .. }) => *period,
            _ => 0,
        };
        let Some(b) = self.buildings.get_mut(&id) else {
            return;
        };
        b.construction_timer = 0.0;
        b.transition(BuildingStatus::Active);
        b.cycle_timer = cycle;
        let worker = b.assigned_villager.take();

        let mut worker_name = String::new();
        if let Some(v) = worker.and_then(|w| self.villagers.get_mut(&w)) {
            worker_name = v.name.clone();
            v.release_home();
        }
        let building_name = kind.to_string();
        self.record(
            ChronicleKey::Completion(mood),
            &[("villager", &worker_name), ("building", &building_name)],
            Some(kind),
        );
        info!(building = %id, %kind, "construction complete");
        self.emit(events, SimEventKind::BuildingCompleted { building: id, kind });

        let active = self.buildings.values().filter(|b| b.is_active()).count();
        if self.config.world.milestones.contains(&active) {
            self.record(
                ChronicleKey::Milestone,
                &[("count", &active.to_string())],
                None,
            );
            info!(active, "milestone reached");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::building::{BuildingKind, BuildingStatus};
    use crate::command::{ActionError, ActionOutcome};
    use crate::mood::Mood;
    use crate::sim::SimState;
    use crate::types::{BuildingId, CellCoord, PlotCoord, Resource, VillagerId};

    fn quiet_sim() -> SimState {
        let mut sim = SimState::new(42);
        sim.config.events.roll_chance = 0.0;
        sim.config.combat.grace_period = u64::MAX;
        for v in sim.villagers.values_mut() {
            v.mood_timer = u32::MAX;
        }
        sim
    }

    fn free_cell(sim: &SimState) -> CellCoord {
        // A cell with all four neighbors free.
        PlotCoord::new(0, 0)
            .cells()
            .find(|c| {
                sim.grid.is_free(*c) && c.work_site_candidates().iter().all(|n| sim.grid.is_free(*n))
            })
            .unwrap()
    }

    fn place(sim: &mut SimState, kind: BuildingKind) -> BuildingId {
        let cell = free_cell(sim);
        match sim.place_building(kind, cell).unwrap() {
            ActionOutcome::Placed { building } => building,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn first(sim: &SimState) -> VillagerId {
        *sim.villagers.keys().next().unwrap()
    }

    #[test]
    fn unaffordable_placement_changes_nothing() {
        let mut sim = quiet_sim();
        sim.ledger.try_spend(Resource::Gears, 60.0).unwrap();
        let cell = free_cell(&sim);
        let before = sim.clone();
        let err = sim.place_building(BuildingKind::SteamMill, cell).unwrap_err();
        assert_eq!(err, ActionError::NoFunds);
        assert_eq!(sim.ledger.get(Resource::Gears), 40.0);
        assert_eq!(sim, before);
    }

    #[test]
    fn placement_rejects_locked_and_occupied_cells() {
        let mut sim = quiet_sim();
        assert_eq!(
            sim.place_building(BuildingKind::ClockworkForge, CellCoord::new(9, 9)).unwrap_err(),
            ActionError::InvalidCell
        );
        let id = place(&mut sim, BuildingKind::ClockworkForge);
        let cell = sim.buildings[&id].cell;
        assert_eq!(
            sim.place_building(BuildingKind::ClockworkForge, cell).unwrap_err(),
            ActionError::CellOccupied
        );
    }

    #[test]
    fn work_cell_is_first_free_neighbor_south_first() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let site = sim.buildings[&b].cell;
        let v = first(&sim);
        let out = sim.assign_villager(b, v).unwrap();
        assert_eq!(out, ActionOutcome::Assigned { work_cell: CellCoord::new(site.x, site.y + 1) });
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Assigned);
        assert_eq!(sim.villagers[&v].walk_progress, 0.0);
    }

    #[test]
    fn forge_builds_and_produces() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(b, v).unwrap();
        // 10 ticks of walking, one tick to start, 10 of building.
        for _ in 0..25 {
            sim.tick();
        }
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Active);
        assert!(sim.ledger.get(Resource::Gears) > 100.0);
        assert!(sim.villagers[&v].assignment.is_none());
        assert_eq!(sim.villagers[&v].target, Some(sim.villagers[&v].home));
    }

    #[test]
    fn grumpy_worker_builds_at_half_speed() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(b, v).unwrap();
        {
            let villager = sim.villagers.get_mut(&v).unwrap();
            villager.walk_progress = 1.0;
        }
        sim.tick();
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Building);
        sim.villagers.get_mut(&v).unwrap().mood = Mood::Grumpy;
        let before = sim.buildings[&b].construction_timer;
        sim.tick();
        assert_eq!(before - sim.buildings[&b].construction_timer, 0.5);
    }

    #[test]
    fn mercy_overrides_certain_refusal() {
        let mut sim = quiet_sim();
        for profile in sim.config.moods.values_mut() {
            profile.refusal_chance = 1.0;
        }
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        assert_eq!(
            sim.assign_villager(b, v).unwrap_err(),
            ActionError::Refused { mood: Mood::Happy }
        );
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Proposed);
        sim.villagers.get_mut(&v).unwrap().negotiation_count = 3;
        assert!(sim.assign_villager(b, v).is_ok());
    }

    #[test]
    fn busy_builder_cannot_be_reassigned() {
        let mut sim = quiet_sim();
        let a = place(&mut sim, BuildingKind::ClockworkForge);
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(a, v).unwrap();
        sim.villagers.get_mut(&v).unwrap().walk_progress = 1.0;
        sim.tick();
        assert_eq!(sim.assign_villager(b, v).unwrap_err(), ActionError::AlreadyBusy);
    }

    #[test]
    fn builder_on_site_cannot_be_unassigned_or_drafted() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(b, v).unwrap();
        sim.villagers.get_mut(&v).unwrap().walk_progress = 1.0;
        sim.tick();
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Building);

        let before = sim.clone();
        assert_eq!(sim.unassign_villager(v).unwrap_err(), ActionError::AlreadyBusy);
        assert_eq!(sim.set_militia(v, true).unwrap_err(), ActionError::AlreadyBusy);
        assert_eq!(sim, before);
    }

    #[test]
    fn lost_builder_pauses_the_site_until_someone_resumes_it() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let ids: Vec<VillagerId> = sim.villagers.keys().copied().collect();
        let (v, w) = (ids[0], ids[1]);
        sim.assign_villager(b, v).unwrap();
        sim.villagers.get_mut(&v).unwrap().walk_progress = 1.0;
        sim.tick();
        sim.tick();
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Building);

        sim.villagers.get_mut(&v).unwrap().health = 0.0;
        sim.tick();
        assert!(!sim.villagers.contains_key(&v));
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Building);
        assert_eq!(sim.buildings[&b].assigned_villager, None);
        let paused = sim.buildings[&b].construction_timer;
        assert!(paused > 0.0);
        sim.tick();
        assert_eq!(sim.buildings[&b].construction_timer, paused);

        {
            let worker = sim.villagers.get_mut(&w).unwrap();
            worker.negotiation_count = 3;
            worker.mood = Mood::Happy;
        }
        assert!(matches!(sim.assign_villager(b, w), Ok(ActionOutcome::Assigned { .. })));
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Building);
        assert_eq!(sim.buildings[&b].assigned_villager, Some(w));
        assert!(sim.villagers[&w].target.is_some());

        for _ in 0..60 {
            sim.tick();
            if sim.buildings[&b].is_active() {
                break;
            }
        }
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Active);
    }

    #[test]
    fn reassignment_releases_the_previous_site() {
        let mut sim = quiet_sim();
        let a = place(&mut sim, BuildingKind::ClockworkForge);
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(a, v).unwrap();
        sim.assign_villager(b, v).unwrap();
        assert_eq!(sim.buildings[&a].status, BuildingStatus::Proposed);
        assert_eq!(sim.buildings[&a].assigned_villager, None);
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Assigned);
    }

    #[test]
    fn unassign_reverts_to_proposed_and_heads_home() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        let v = first(&sim);
        sim.assign_villager(b, v).unwrap();
        sim.tick();
        sim.tick();
        let mid = sim.villagers[&v].current_position();
        sim.unassign_villager(v).unwrap();
        let villager = &sim.villagers[&v];
        assert_eq!(villager.position, mid);
        assert_eq!(villager.target, Some(villager.home));
        assert_eq!(sim.buildings[&b].status, BuildingStatus::Proposed);
    }

    #[test]
    fn upgrade_costs_level_times_three_blueprints() {
        let mut sim = quiet_sim();
        let b = place(&mut sim, BuildingKind::ClockworkForge);
        assert_eq!(sim.upgrade_building(b).unwrap_err(), ActionError::NotActive);
        sim.buildings.get_mut(&b).unwrap().status = BuildingStatus::Active;
        assert_eq!(sim.upgrade_building(b).unwrap_err(), ActionError::NoFunds);
        sim.ledger.credit(Resource::Blueprints, 9.0);
        assert_eq!(sim.upgrade_building(b).unwrap(), ActionOutcome::Upgraded { level: 2 });
        assert_eq!(sim.ledger.get(Resource::Blueprints), 6.0);
        assert_eq!(sim.upgrade_building(b).unwrap(), ActionOutcome::Upgraded { level: 3 });
        assert_eq!(sim.ledger.get(Resource::Blueprints), 0.0);
    }

    #[test]
    fn trade_boost_doubles_production_then_recharges() {
        let mut sim = quiet_sim();
        sim.ledger.credit(Resource::Steam, 40.0);
        sim.ledger.credit(Resource::Crystals, 20.0);
        let dock = place(&mut sim, BuildingKind::AirshipDock);
        let forge = place(&mut sim, BuildingKind::ClockworkForge);
        assert_eq!(sim.activate_trade_boost(dock).unwrap_err(), ActionError::NotActive);
        sim.buildings.get_mut(&dock).unwrap().status = BuildingStatus::Active;
        sim.buildings.get_mut(&forge).unwrap().status = BuildingStatus::Active;

        sim.activate_trade_boost(dock).unwrap();
        assert_eq!(sim.activate_trade_boost(dock).unwrap_err(), ActionError::BoostUnavailable);
        let before = sim.ledger.get(Resource::Gears);
        sim.tick();
        assert_eq!(sim.ledger.get(Resource::Gears) - before, 10.0);

        for _ in 0..40 {
            sim.tick();
        }
        assert_eq!(sim.trade_boost_timer, 0);
        assert_eq!(sim.activate_trade_boost(dock).unwrap_err(), ActionError::BoostUnavailable);
        for _ in 0..60 {
            sim.tick();
        }
        assert!(sim.activate_trade_boost(dock).is_ok());
    }

    #[test]
    fn aura_boosts_other_buildings_in_its_plot() {
        let mut sim = quiet_sim();
        sim.ledger.credit(Resource::Metal, 30.0);
        sim.ledger.credit(Resource::Water, 20.0);
        sim.ledger.credit(Resource::Crystals, 25.0);
        let conduit = place(&mut sim, BuildingKind::AetherConduit);
        let forge = place(&mut sim, BuildingKind::ClockworkForge);
        sim.buildings.get_mut(&conduit).unwrap().status = BuildingStatus::Active;
        sim.buildings.get_mut(&forge).unwrap().status = BuildingStatus::Active;
        let before = sim.ledger.get(Resource::Gears);
        sim.tick();
        assert_eq!(sim.ledger.get(Resource::Gears) - before, 6.25);
    }

    #[test]
    fn fifth_active_building_is_a_milestone() {
        let mut sim = quiet_sim();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(place(&mut sim, BuildingKind::ClockworkForge));
        }
        for id in &ids[..4] {
            sim.buildings.get_mut(id).unwrap().status = BuildingStatus::Active;
        }
        let v = first(&sim);
        sim.assign_villager(ids[4], v).unwrap();
        {
            let b = sim.buildings.get_mut(&ids[4]).unwrap();
            b.status = BuildingStatus::Building;
            b.construction_timer = 0.5;
        }
        sim.villagers.get_mut(&v).unwrap().snap_to_target();
        sim.tick();
        assert_eq!(sim.buildings[&ids[4]].status, BuildingStatus::Active);
        assert!(sim.chronicle.iter().any(|e| e.text.contains("5 structures")));
    }
}
