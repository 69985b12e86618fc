// Raiders, defenses, militia and the death sweep.
//
// Phase 5 (`step_enemies`), in order:
// - spawn: after the grace period a raid may arrive each tick. The spawn
//   chance, the raid size and raider health all ramp with the ticks elapsed
//   since the grace period ended. Raid size is capped at
//   `group_cap_without_housing` until the village has active housing, and at
//   `group_cap_per_plot × unlocked plots` after. Raiders enter on the edge
//   cells of one random unlocked plot.
// - retarget: every raider picks the nearest standing building or living
//   villager (buildings win ties). No path memory is kept between ticks.
// - move: straight at the target, at half speed inside any watchtower zone.
// - volleys: every tesla coil that fired this tick hits all raiders in range.
//   Each kill pays a crystal bounty.
// - melee: a raider within `melee_range` of its target strikes it. A
//   building at zero health is destroyed, its cell freed and its worker
//   released. A struck villager who is neither militia nor assigned runs
//   home.
//
// Phase 7 (`step_militia`): idle militia chase their rally target, or the
// nearest raider, and strike every `militia_attack_period` ticks once in
// melee range. Militia with nothing to fight regenerate and walk home.
//
// Phase 8 (`remove_the_dead`): dead raiders, dead villagers and destroyed
// buildings leave the snapshot. A dead villager frees its work site and any
// feud pointing at it. An empty roster ends the game.
//
// The damage model is contact only: a raider damages nothing unless it is in
// melee range of the target it chose this tick.

use super::SimState;
use crate::building::{AbilityEffect, BuildingStatus};
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::config::CombatConfig;
use crate::enemy::Enemy;
use crate::event::{SimEvent, SimEventKind};
use crate::grid::CellRef;
use crate::types::{BuildingId, EnemyId, Point, Resource, VillagerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Village-wide danger, derived from the live raider count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Calm,
    Watchful,
    Raid,
    Siege,
}

impl ThreatLevel {
    pub fn from_enemy_count(count: usize, config: &CombatConfig) -> Self {
        if count >= config.threat_siege {
            ThreatLevel::Siege
        } else if count >= config.threat_raid {
            ThreatLevel::Raid
        } else if count >= config.threat_watchful {
            ThreatLevel::Watchful
        } else {
            ThreatLevel::Calm
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreatLevel::Calm => "calm",
            ThreatLevel::Watchful => "watchful",
            ThreatLevel::Raid => "raid",
            ThreatLevel::Siege => "siege",
        };
        f.write_str(label)
    }
}

/// What a raider is going after this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Quarry {
    Building(BuildingId),
    Villager(VillagerId),
}

impl SimState {
    // -----------------------------------------------------------------------
    // Phase 5: raiders
    // -----------------------------------------------------------------------

    pub(super) fn step_enemies(&mut self, effects: &[AbilityEffect], events: &mut Vec<SimEvent>) {
        self.spawn_raid(events);

        let ids: Vec<EnemyId> = self
            .enemies
            .values()
            .filter(|e| e.is_alive())
            .map(|e| e.id)
            .collect();

        let mut quarries = Vec::with_capacity(ids.len());
        for &id in &ids {
            let Some(from) = self.enemies.get(&id).map(|e| e.position) else {
                continue;
            };
            let Some((quarry, point)) = self.nearest_quarry(from) else {
                continue;
            };
            let slowed = effects.iter().any(|effect| match effect {
                AbilityEffect::Watch { origin, range } => origin.distance(from) <= *range,
                _ => false,
            });
            if let Some(e) = self.enemies.get_mut(&id) {
                e.target = point;
                e.step(if slowed { 0.5 } else { 1.0 });
            }
            quarries.push((id, quarry));
        }

        for effect in effects {
            if let AbilityEffect::Volley {
                origin,
                range,
                damage,
            } = *effect
            {
                self.fire_volley(origin, range, damage, events);
            }
        }

        for (id, quarry) in quarries {
            self.melee(id, quarry, events);
        }
    }

    fn spawn_raid(&mut self, events: &mut Vec<SimEvent>) {
        let c = &self.config.combat;
        if self.tick <= c.grace_period {
            return;
        }
        let elapsed = self.tick - c.grace_period;
        let chance = (c.spawn_chance_base + c.spawn_chance_growth * elapsed as f64)
            .min(c.spawn_chance_max);
        if !self.rng.chance(chance) {
            return;
        }

        let c = &self.config.combat;
        let ramp = 1 + elapsed / c.group_growth_interval.max(1);
        let has_housing = self.buildings.values().any(|b| {
            b.is_active()
                && self
                    .config
                    .buildings
                    .get(&b.kind)
                    .is_some_and(|d| d.ability.housing_capacity() > 0)
        });
        let cap = if has_housing {
            c.group_cap_per_plot as u64 * self.grid.plot_count() as u64
        } else {
            c.group_cap_without_housing as u64
        };
        let count = ramp.min(cap).max(1) as u32;
        let steps = (elapsed / c.enemy_health_interval.max(1)) as f32;
        let health = (c.enemy_base_health + c.enemy_health_growth * steps).min(c.enemy_max_health_cap);
        let speed = c.enemy_speed;

        let plots: Vec<_> = self.grid.plots().collect();
        let Some(&plot) = self.rng.pick(&plots) else {
            return;
        };
        let edge = plot.edge_cells();
        for _ in 0..count {
            let Some(&cell) = self.rng.pick(&edge) else {
                break;
            };
            let id = self.ids.enemy();
            self.enemies.insert(id, Enemy::new(id, cell.center(), health, speed));
        }

        self.record(ChronicleKey::Raid, &[("count", &count.to_string())], None);
        info!(count, health, %plot, "raid spawned");
        self.emit(events, SimEventKind::RaidSpawned { count });
    }

    /// Nearest standing building or living villager to `from`.
    fn nearest_quarry(&self, from: Point) -> Option<(Quarry, Point)> {
        let buildings = self
            .buildings
            .values()
            .filter(|b| b.is_attackable())
            .map(|b| (Quarry::Building(b.id), b.position()));
        let villagers = self
            .villagers
            .values()
            .filter(|v| v.is_alive())
            .map(|v| (Quarry::Villager(v.id), v.current_position()));

        let mut best: Option<(Quarry, Point, f32)> = None;
        for (quarry, point) in buildings.chain(villagers) {
            let d = from.distance(point);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((quarry, point, d));
            }
        }
        best.map(|(q, p, _)| (q, p))
    }

    fn fire_volley(&mut self, origin: Point, range: f32, damage: f32, events: &mut Vec<SimEvent>) {
        let mut killed = Vec::new();
        for e in self.enemies.values_mut() {
            if e.is_alive() && origin.distance(e.position) <= range && e.take_damage(damage) {
                killed.push(e.id);
            }
        }
        for id in killed {
            self.award_kill(id, events);
        }
    }

    fn award_kill(&mut self, id: EnemyId, events: &mut Vec<SimEvent>) {
        self.ledger
            .credit(Resource::Crystals, self.config.combat.kill_bounty);
        debug!(enemy = %id, "raider killed");
        self.emit(events, SimEventKind::EnemyKilled { enemy: id });
    }

    fn melee(&mut self, id: EnemyId, quarry: Quarry, events: &mut Vec<SimEvent>) {
        let Some(at) = self
            .enemies
            .get(&id)
            .filter(|e| e.is_alive())
            .map(|e| e.position)
        else {
            return;
        };
        let reach = self.config.combat.melee_range;
        match quarry {
            Quarry::Building(bid) => {
                let damage = self.config.combat.enemy_building_damage;
                let Some(b) = self.buildings.get_mut(&bid) else {
                    return;
                };
                if !b.is_attackable() || at.distance(b.position()) > reach {
                    return;
                }
                b.health = (b.health - damage).max(0.0);
                if b.health <= 0.0 {
                    self.destroy_building(bid, events);
                }
            }
            Quarry::Villager(vid) => {
                let damage = self.config.combat.enemy_villager_damage;
                let Some(v) = self.villagers.get_mut(&vid) else {
                    return;
                };
                if !v.is_alive() || at.distance(v.current_position()) > reach {
                    return;
                }
                v.take_damage(damage);
                if v.is_alive() && !v.is_militia && v.assignment.is_none() {
                    v.flee_home();
                }
            }
        }
    }

    fn destroy_building(&mut self, id: BuildingId, events: &mut Vec<SimEvent>) {
        let Some(b) = self.buildings.get_mut(&id) else {
            return;
        };
        if !b.transition(BuildingStatus::Destroyed) {
            return;
        }
        let (kind, cell) = (b.kind, b.cell);
        let worker = b.assigned_villager.take();
        self.grid.release(cell, CellRef::Building(id));
        if let Some(vid) = worker {
            self.send_home(vid);
        }
        self.record(
            ChronicleKey::BuildingDestroyed,
            &[("building", &kind.to_string())],
            Some(kind),
        );
        info!(building = %id, %kind, "building destroyed");
        self.emit(events, SimEventKind::BuildingDestroyed { building: id, kind });
    }

    // -----------------------------------------------------------------------
    // Phase 7: militia
    // -----------------------------------------------------------------------

    pub(super) fn step_militia(&mut self, events: &mut Vec<SimEvent>) {
        let ids: Vec<VillagerId> = self
            .villagers
            .values()
            .filter(|v| v.is_militia && v.is_alive() && !v.is_resting() && v.assignment.is_none())
            .map(|v| v.id)
            .collect();
        let c = self.config.combat.clone();

        for vid in ids {
            let Some(v) = self.villagers.get(&vid) else {
                continue;
            };
            let here = v.current_position();
            let rallied = v
                .rally_target
                .filter(|eid| self.enemies.get(eid).is_some_and(|e| e.is_alive()));
            let quarry = rallied.or_else(|| self.nearest_enemy(here));

            let Some(eid) = quarry else {
                let Some(v) = self.villagers.get_mut(&vid) else {
                    continue;
                };
                v.attack_cooldown = v.attack_cooldown.saturating_sub(1);
                v.heal(c.militia_regen);
                if v.target.is_none() && v.position != v.home {
                    v.walk_to(v.home);
                }
                continue;
            };

            let Some(enemy_at) = self.enemies.get(&eid).map(|e| e.position) else {
                continue;
            };
            let Some(v) = self.villagers.get_mut(&vid) else {
                continue;
            };
            if v.target.is_some() {
                v.halt();
            }
            if v.position.distance(enemy_at) > c.melee_range {
                v.position = v.position.step_toward(enemy_at, c.militia_speed);
            }
            v.attack_cooldown = v.attack_cooldown.saturating_sub(1);
            if v.attack_cooldown > 0 || v.position.distance(enemy_at) > c.melee_range {
                continue;
            }
            v.attack_cooldown = c.militia_attack_period.max(1);
            let killed = self
                .enemies
                .get_mut(&eid)
                .is_some_and(|e| e.take_damage(c.militia_damage));
            if killed {
                self.award_kill(eid, events);
            }
        }
    }

    fn nearest_enemy(&self, from: Point) -> Option<EnemyId> {
        let mut best: Option<(EnemyId, f32)> = None;
        for e in self.enemies.values().filter(|e| e.is_alive()) {
            let d = from.distance(e.position);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((e.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Pull every able militia villager off its work and point it at `enemy`.
    /// Builders mid-construction stay on their sites.
    pub fn rally_militia_to(&mut self, enemy: EnemyId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        if !self.enemies.get(&enemy).is_some_and(|e| e.is_alive()) {
            return Err(ActionError::UnknownEnemy);
        }
        let militia: Vec<VillagerId> = self
            .villagers
            .values()
            .filter(|v| v.is_militia && v.is_alive() && !v.is_resting())
            .filter(|v| !self.is_constructing(v.id))
            .map(|v| v.id)
            .collect();
        for &vid in &militia {
            self.release_assignment(vid);
            if let Some(v) = self.villagers.get_mut(&vid) {
                v.halt();
                v.fleeing = false;
                v.rally_target = Some(enemy);
            }
        }
        debug!(enemy = %enemy, count = militia.len(), "militia rallied");
        Ok(ActionOutcome::Rallied {
            count: militia.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Phase 8: the dead and the destroyed
    // -----------------------------------------------------------------------

    pub(super) fn remove_the_dead(&mut self, events: &mut Vec<SimEvent>) {
        self.enemies.retain(|_, e| e.is_alive());
        let enemies = &self.enemies;
        for v in self.villagers.values_mut() {
            if v.rally_target.is_some_and(|eid| !enemies.contains_key(&eid)) {
                v.rally_target = None;
            }
        }

        let dead: Vec<VillagerId> = self
            .villagers
            .values()
            .filter(|v| !v.is_alive())
            .map(|v| v.id)
            .collect();
        for vid in dead {
            self.release_assignment(vid);
            let Some(v) = self.villagers.remove(&vid) else {
                continue;
            };
            for other in self.villagers.values_mut() {
                if other.feud_target == Some(vid) {
                    other.feud_target = None;
                }
            }
            self.record(ChronicleKey::VillagerDied, &[("villager", &v.name)], None);
            info!(villager = %vid, name = %v.name, "villager died");
            self.emit(events, SimEventKind::VillagerDied { villager: vid });
        }

        let grid = &mut self.grid;
        self.buildings.retain(|id, b| {
            if b.status.is_terminal() {
                grid.release(b.cell, CellRef::Building(*id));
                false
            } else {
                true
            }
        });

        if self.villagers.is_empty() {
            self.declare_game_over(events);
        }
    }
}
