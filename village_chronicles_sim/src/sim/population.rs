// Population cap, overcrowding and wanderer arrivals.
//
// The cap is `population.base_cap` plus the capacity of every active
// housing building. Nothing stops the roster from exceeding it (a wanderer
// can join a full village); overcrowding is a soft penalty applied in the
// villager step, which drains mood timers faster and knocks happy villagers
// down to tired when their timer runs out.
//
// Every `wanderer_interval` ticks a wanderer may turn up at the village edge,
// but only while nobody else is waiting and the village has room. The player
// accepts (a new villager settles on a free cell of the home plot) or
// rejects (the wanderer leaves).

use super::SimState;
use super::plots::HOME_PLOT;
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::event::{SimEvent, SimEventKind};
use crate::types::CellCoord;
use crate::villager::{Villager, generate_wanderer, roll_mood_timer};
use tracing::info;

impl SimState {
    /// Phase 4. Also run as part of the aggregate recompute.
    pub(super) fn update_population(&mut self) {
        let housing: u32 = self
            .buildings
            .values()
            .filter(|b| b.is_active())
            .filter_map(|b| self.config.buildings.get(&b.kind))
            .map(|def| def.ability.housing_capacity())
            .sum();
        self.population = self.villagers.len();
        self.max_population = self.config.population.base_cap + housing;
    }

    /// Phase 9.
    pub(super) fn check_wanderers(&mut self, events: &mut Vec<SimEvent>) {
        let interval = self.config.world.wanderer_interval.max(1);
        if self.tick % interval != 0 || self.pending_wanderer.is_some() {
            return;
        }
        if self.villagers.len() as u64 >= self.max_population as u64 {
            return;
        }
        let wanderer = generate_wanderer(&mut self.rng);
        let name = wanderer.name.clone();
        self.pending_wanderer = Some(wanderer);
        self.record(ChronicleKey::WandererArrived, &[("villager", &name)], None);
        info!(%name, "a wanderer asks to join");
        self.emit(events, SimEventKind::WandererArrived { name });
    }

    pub fn accept_wanderer(&mut self) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        if self.pending_wanderer.is_none() {
            return Err(ActionError::NoPendingWanderer);
        }
        let free: Vec<CellCoord> = self.grid.free_cells_in(HOME_PLOT);
        let cell = *self.rng.pick(&free).ok_or(ActionError::NoOpenCell)?;
        let Some(wanderer) = self.pending_wanderer.take() else {
            return Err(ActionError::NoPendingWanderer);
        };

        let id = self.ids.villager();
        let timer = roll_mood_timer(&self.config.villager, &mut self.rng);
        let name = wanderer.name.clone();
        let villager = Villager::new(
            id,
            wanderer.name,
            wanderer.role,
            wanderer.personality,
            cell,
            &self.config.villager,
            timer,
        );
        self.villagers.insert(id, villager);
        self.update_population();
        self.record(ChronicleKey::WandererAccepted, &[("villager", &name)], None);
        info!(villager = %id, %name, %cell, "wanderer joined the village");
        Ok(ActionOutcome::WandererAccepted { villager: id })
    }

    pub fn reject_wanderer(&mut self) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let wanderer = self
            .pending_wanderer
            .take()
            .ok_or(ActionError::NoPendingWanderer)?;
        self.record(
            ChronicleKey::WandererRejected,
            &[("villager", &wanderer.name)],
            None,
        );
        Ok(ActionOutcome::WandererRejected)
    }
}

#[cfg(test)]
mod tests {
    use crate::building::{BuildingKind, BuildingStatus};
    use crate::command::{ActionError, ActionOutcome};
    use crate::mood::Mood;
    use crate::sim::SimState;
    use crate::types::{CellCoord, Resource};

    fn quiet_sim() -> SimState {
        let mut sim = SimState::new(42);
        sim.config.events.roll_chance = 0.0;
        sim.config.combat.grace_period = u64::MAX;
        sim
    }

    fn active_cottage(sim: &mut SimState, cell: CellCoord) {
        sim.ledger.credit(Resource::Wood, 30.0);
        sim.ledger.credit(Resource::Stone, 20.0);
        let ActionOutcome::Placed { building } =
            sim.place_building(BuildingKind::Cottage, cell).unwrap()
        else {
            panic!("not placed");
        };
        sim.buildings.get_mut(&building).unwrap().status = BuildingStatus::Active;
    }

    fn free_cell(sim: &SimState) -> CellCoord {
        sim.grid.free_cells_in(crate::types::PlotCoord::new(0, 0))[0]
    }

    #[test]
    fn housing_raises_the_cap() {
        let mut sim = quiet_sim();
        let cell = free_cell(&sim);
        active_cottage(&mut sim, cell);
        sim.tick();
        assert_eq!(sim.max_population, 5);
        assert_eq!(sim.population, 3);
    }

    #[test]
    fn no_wanderers_while_full() {
        let mut sim = quiet_sim();
        sim.run(sim.config.world.wanderer_interval * 3);
        assert!(sim.pending_wanderer.is_none());
    }

    #[test]
    fn wanderer_arrives_on_interval_when_there_is_room() {
        let mut sim = quiet_sim();
        let cell = free_cell(&sim);
        active_cottage(&mut sim, cell);
        let interval = sim.config.world.wanderer_interval;
        sim.run(interval - 1);
        assert!(sim.pending_wanderer.is_none());
        sim.tick();
        assert!(sim.pending_wanderer.is_some());
        assert!(sim.chronicle.iter().any(|e| e.text.contains("asking to stay")));
    }

    #[test]
    fn accepting_adds_a_happy_villager_at_home() {
        let mut sim = quiet_sim();
        assert_eq!(sim.accept_wanderer().unwrap_err(), ActionError::NoPendingWanderer);
        sim.pending_wanderer = Some(crate::villager::generate_wanderer(&mut sim.rng));
        let ActionOutcome::WandererAccepted { villager } = sim.accept_wanderer().unwrap() else {
            panic!("not accepted");
        };
        let v = &sim.villagers[&villager];
        assert_eq!(v.mood, Mood::Happy);
        assert_eq!(v.home.nearest_cell().plot(), crate::types::PlotCoord::new(0, 0));
        assert!(sim.pending_wanderer.is_none());
        assert_eq!(sim.population, 4);
        assert!(sim.is_overcrowded());
    }

    #[test]
    fn rejecting_discards_the_wanderer() {
        let mut sim = quiet_sim();
        sim.pending_wanderer = Some(crate::villager::generate_wanderer(&mut sim.rng));
        assert_eq!(sim.reject_wanderer().unwrap(), ActionOutcome::WandererRejected);
        assert!(sim.pending_wanderer.is_none());
        assert_eq!(sim.villagers.len(), 3);
    }

    #[test]
    fn overcrowding_tires_happy_villagers() {
        let mut sim = quiet_sim();
        sim.pending_wanderer = Some(crate::villager::generate_wanderer(&mut sim.rng));
        sim.accept_wanderer().unwrap();
        for v in sim.villagers.values_mut() {
            v.mood = Mood::Happy;
            v.mood_timer = 3;
        }
        sim.tick();
        assert!(sim.villagers.values().all(|v| v.mood == Mood::Tired));
    }
}
