// Global timers and the random event engine (phases 10 and 11).
//
// Phase 10 counts down the trade boost and the active random event. A
// finished boost emits `TradeBoostEnded`; a finished event simply clears,
// which re-opens the roll.
//
// Phase 11 rolls for a new event only while none is active. The kind is
// weighted by the happiness aggregate computed at the end of the previous
// tick (see `event::roll_random_event`):
// - production surge / worker slowdown: a global production multiplier for
//   `modifier_duration` ticks;
// - feud outbreak: two random villagers turn on each other at once;
// - festival: everyone is happy at once and every feud ends.
// Instant events still occupy `instant_cooldown` ticks so they cannot fire
// back to back.

use super::SimState;
use crate::chronicle::ChronicleKey;
use crate::event::{self, ActiveEvent, RandomEventKind, SimEvent, SimEventKind};
use crate::mood::Mood;
use crate::types::VillagerId;
use tracing::info;

impl SimState {
    pub(super) fn tick_timers(&mut self, events: &mut Vec<SimEvent>) {
        if self.trade_boost_timer > 0 {
            self.trade_boost_timer -= 1;
            if self.trade_boost_timer == 0 {
                info!("trade boost ended");
                self.emit(events, SimEventKind::TradeBoostEnded);
            }
        }

        if let Some(active) = self.active_event.as_mut() {
            active.timer = active.timer.saturating_sub(1);
            if active.timer == 0 {
                self.active_event = None;
            }
        }
    }

    pub(super) fn roll_random_event(&mut self, events: &mut Vec<SimEvent>) {
        if self.active_event.is_some() {
            return;
        }
        let Some(kind) = event::roll_random_event(self.happiness, &self.config.events, &mut self.rng)
        else {
            return;
        };
        self.active_event = Some(ActiveEvent::new(kind, &self.config.events));
        match kind {
            RandomEventKind::ProductionSurge | RandomEventKind::WorkerSlowdown => {}
            RandomEventKind::FeudOutbreak => self.feud_outbreak(),
            RandomEventKind::Festival => self.festival(),
        }
        self.record(
            ChronicleKey::RandomEvent,
            &[("event", &kind.to_string())],
            None,
        );
        info!(%kind, happiness = self.happiness, "random event");
        self.emit(events, SimEventKind::RandomEvent { kind });
    }

    /// Two random villagers start feuding with each other.
    fn feud_outbreak(&mut self) {
        let mut pool: Vec<VillagerId> = self.villagers.keys().copied().collect();
        if pool.len() < 2 {
            return;
        }
        let first = pool.remove(self.rng.range_usize(0, pool.len()));
        let second = pool[self.rng.range_usize(0, pool.len())];
        for (id, rival) in [(first, second), (second, first)] {
            if let Some(v) = self.villagers.get_mut(&id) {
                v.mood = Mood::Feuding;
                v.feud_target = Some(rival);
            }
        }
        let (a, b) = (self.villager_name(first), self.villager_name(second));
        self.record(ChronicleKey::Feud, &[("villager", &a), ("target", &b)], None);
    }

    /// Everyone cheers up and every grudge is forgotten.
    fn festival(&mut self) {
        for v in self.villagers.values_mut() {
            if !v.is_resting() {
                v.mood = Mood::Happy;
            }
            v.feud_target = None;
        }
        self.record(ChronicleKey::Festival, &[], None);
    }
}
