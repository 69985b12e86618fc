// Raiders.
//
// An enemy walks in a straight line toward its current target at a constant
// speed (halved inside a watchtower's range). Targets are re-picked every
// tick in `sim/combat.rs`; the enemy itself keeps no path memory beyond the
// last chosen point.

use crate::types::{EnemyId, Point};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EnemyId,
    pub position: Point,
    pub target: Point,
    pub health: f32,
    pub max_health: f32,
    /// Cells per tick.
    pub speed: f32,
}

impl Enemy {
    pub fn new(id: EnemyId, position: Point, health: f32, speed: f32) -> Self {
        Self {
            id,
            position,
            target: position,
            health,
            max_health: health,
            speed,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Apply damage. Returns true if this hit killed the enemy.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = self.is_alive();
        self.health = (self.health - amount).max(0.0);
        was_alive && !self.is_alive()
    }

    pub fn step(&mut self, speed_factor: f32) {
        self.position = self.position.step_toward(self.target, self.speed * speed_factor);
    }
}
