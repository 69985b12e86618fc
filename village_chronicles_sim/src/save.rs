// Save documents: versioned JSON snapshots of the whole world.
//
// A save is `{ "version": N, "state": <SimState> }`. The state carries
// everything, including the config and the PRNG, so a restored world
// continues exactly where the saved one would have.
//
// Restoring normalizes the snapshot before handing it back:
// - id counters are reseated above the largest id present, so a hand-edited
//   or older document can never hand out a duplicate id;
// - walking villagers are snapped to their destination (no walk resumes
//   across a save boundary);
// - dead raiders are pruned;
// - references to entities that no longer exist (grid cells, feud and rally
//   targets, assignments, building workers) are dropped.
//
// A document that cannot be restored (malformed JSON, wrong version) is an
// error from `restore_json`. `load_or_default` turns any such error into a
// fresh world so a bad save never prevents play.

use crate::building::BuildingStatus;
use crate::grid::CellRef;
use crate::sim::SimState;
use crate::villager::Assignment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct SaveDocument {
    pub version: u32,
    pub state: SimState,
}

#[derive(Serialize)]
struct SaveDocumentRef<'a> {
    version: u32,
    state: &'a SimState,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("malformed save document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize the world into a save document.
pub fn save_json(state: &SimState) -> Result<String, SaveError> {
    let doc = SaveDocumentRef {
        version: SAVE_VERSION,
        state,
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Parse and normalize a save document.
pub fn restore_json(json: &str) -> Result<SimState, SaveError> {
    let doc: SaveDocument = serde_json::from_str(json)?;
    if doc.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            found: doc.version,
            expected: SAVE_VERSION,
        });
    }
    let mut state = doc.state;
    normalize(&mut state);
    Ok(state)
}

/// Restore a save, or start a new world from `seed` if it cannot be read.
pub fn load_or_default(json: &str, seed: u64) -> SimState {
    match restore_json(json) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, seed, "save could not be restored; starting a new world");
            SimState::new(seed)
        }
    }
}

pub fn save_to_path(state: &SimState, path: &Path) -> Result<(), SaveError> {
    std::fs::write(path, save_json(state)?)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<SimState, SaveError> {
    let json = std::fs::read_to_string(path)?;
    restore_json(&json)
}

fn normalize(state: &mut SimState) {
    state.enemies.retain(|_, e| e.is_alive());

    // Workers that no longer exist release their sites. A site still waiting
    // for its worker reopens; one under construction keeps its progress.
    for b in state.buildings.values_mut() {
        let worker_gone = b
            .assigned_villager
            .is_some_and(|v| !state.villagers.contains_key(&v));
        if worker_gone {
            b.assigned_villager = None;
        }
        if b.assigned_villager.is_none() && b.status == BuildingStatus::Assigned {
            b.status = BuildingStatus::Proposed;
        }
    }

    let villager_ids: Vec<_> = state.villagers.keys().copied().collect();
    for v in state.villagers.values_mut() {
        if v.feud_target.is_some_and(|t| !villager_ids.contains(&t)) {
            v.feud_target = None;
        }
        if v.rally_target.is_some_and(|e| !state.enemies.contains_key(&e)) {
            v.rally_target = None;
        }
        let site_exists = match v.assignment {
            Some(Assignment::Building(b)) => state
                .buildings
                .get(&b)
                .is_some_and(|b| b.assigned_villager == Some(v.id)),
            Some(Assignment::Node(n)) => state.nodes.contains_key(&n),
            None => true,
        };
        if !site_exists {
            v.assignment = None;
            v.harvest_timer = 0;
        }
        if v.target.is_some() {
            v.snap_to_target();
        }
    }

    let (buildings, nodes) = (&state.buildings, &state.nodes);
    state.grid.retain(|cell, what| match what {
        CellRef::Building(id) => buildings
            .get(&id)
            .is_some_and(|b| b.cell == cell && !b.status.is_terminal()),
        CellRef::Node(id) => nodes.get(&id).is_some_and(|n| n.cell == cell),
    });

    let ids = &mut state.ids;
    let above = |max: Option<u64>, next: u64| max.map_or(next, |m| next.max(m + 1));
    ids.next_building = above(state.buildings.keys().map(|k| k.0).max(), ids.next_building);
    ids.next_villager = above(state.villagers.keys().map(|k| k.0).max(), ids.next_villager);
    ids.next_node = above(state.nodes.keys().map(|k| k.0).max(), ids.next_node);
    ids.next_enemy = above(state.enemies.keys().map(|k| k.0).max(), ids.next_enemy);
    ids.next_chronicle = above(state.chronicle.iter().map(|c| c.id.0).max(), ids.next_chronicle);

    state.recompute_aggregates();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingKind;
    use crate::command::ActionOutcome;
    use crate::enemy::Enemy;
    use crate::types::{BuildingId, EnemyId, PlotCoord, Point, VillagerId};

    #[test]
    fn save_and_restore_roundtrip() {
        let mut sim = SimState::new(42);
        sim.run(150);
        let json = save_json(&sim).unwrap();
        let restored = restore_json(&json).unwrap();
        // Normalizing an already-normalized world changes nothing.
        let again = save_json(&restored).unwrap();
        assert_eq!(restore_json(&again).unwrap(), restored);
        assert_eq!(restored.tick, sim.tick);
        assert_eq!(restored.ledger, sim.ledger);
        assert_eq!(restored.rng, sim.rng);
    }

    #[test]
    fn restored_world_continues_identically() {
        let mut sim = SimState::new(42);
        sim.run(30);
        for v in sim.villagers.values_mut() {
            v.snap_to_target();
        }
        let mut restored = restore_json(&save_json(&sim).unwrap()).unwrap();
        sim.run(200);
        restored.run(200);
        assert_eq!(save_json(&sim).unwrap(), save_json(&restored).unwrap());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let sim = SimState::new(1);
        let json = save_json(&sim).unwrap().replacen("\"version\":1", "\"version\":99", 1);
        assert!(matches!(
            restore_json(&json),
            Err(SaveError::VersionMismatch { found: 99, expected: 1 })
        ));
    }

    #[test]
    fn corrupt_save_falls_back_to_a_new_world() {
        let sim = load_or_default("{ not json", 7);
        assert_eq!(sim, SimState::new(7));
        let sim = load_or_default("", 7);
        assert_eq!(sim.tick, 0);
    }

    #[test]
    fn restore_normalizes_the_snapshot() {
        let mut sim = SimState::new(42);
        let ids: Vec<VillagerId> = sim.villagers.keys().copied().collect();
        {
            let v = sim.villagers.get_mut(&ids[0]).unwrap();
            v.walk_to(Point::new(6.0, 6.0));
            v.walk_progress = 0.4;
            v.feud_target = Some(VillagerId(77));
        }
        sim.enemies.insert(EnemyId(5), {
            let mut e = Enemy::new(EnemyId(5), Point::new(0.0, 0.0), 3.0, 0.1);
            e.health = 0.0;
            e
        });
        sim.enemies.insert(EnemyId(9), Enemy::new(EnemyId(9), Point::new(1.0, 0.0), 3.0, 0.1));
        sim.ids.next_enemy = 1;

        let restored = restore_json(&save_json(&sim).unwrap()).unwrap();
        let v = &restored.villagers[&ids[0]];
        assert_eq!(v.position, Point::new(6.0, 6.0));
        assert_eq!(v.target, None);
        assert_eq!(v.feud_target, None);
        assert!(!restored.enemies.contains_key(&EnemyId(5)));
        assert!(restored.enemies.contains_key(&EnemyId(9)));
        assert_eq!(restored.ids.next_enemy, 10);
        assert!(restored.ids.next_villager > ids.iter().map(|v| v.0).max().unwrap());
    }

    #[test]
    fn sites_missing_their_worker_keep_construction_progress() {
        let mut sim = SimState::new(42);
        let cells = sim.grid.free_cells_in(PlotCoord::new(0, 0));
        let place = |sim: &mut SimState, i: usize| -> BuildingId {
            match sim.place_building(BuildingKind::ClockworkForge, cells[i]).unwrap() {
                ActionOutcome::Placed { building } => building,
                other => panic!("unexpected {other:?}"),
            }
        };
        let waiting = place(&mut sim, 0);
        let underway = place(&mut sim, 5);
        for (id, status) in [(waiting, BuildingStatus::Assigned), (underway, BuildingStatus::Building)] {
            let b = sim.buildings.get_mut(&id).unwrap();
            b.status = status;
            b.assigned_villager = Some(VillagerId(88));
        }
        sim.buildings.get_mut(&underway).unwrap().construction_timer = 4.0;

        let restored = restore_json(&save_json(&sim).unwrap()).unwrap();
        assert_eq!(restored.buildings[&waiting].status, BuildingStatus::Proposed);
        assert_eq!(restored.buildings[&waiting].assigned_villager, None);
        assert_eq!(restored.buildings[&underway].status, BuildingStatus::Building);
        assert_eq!(restored.buildings[&underway].assigned_villager, None);
        assert_eq!(restored.buildings[&underway].construction_timer, 4.0);
    }
}
