// Villager agents: the per-tick mood/rest/walk step and the player's mood
// actions.
//
// Per tick (phase 1), for every villager:
// - resting: count the rest timer down and regenerate health. When it
//   reaches zero the villager wakes happy with a fresh mood timer.
// - otherwise: count the mood timer down (faster while overcrowded). When it
//   expires, roll a new mood from the personality table; landing on feuding
//   picks a random rival, anything else ends the feud. An overcrowded
//   village instead knocks happy villagers down to tired.
// - walking: advance walk progress by `walk_step × work_speed`. Unassigned
//   villagers settle on arrival; assigned ones are settled by the
//   construction and harvest phases.
//
// Player actions here: `negotiate_with_villager`, `worsen_villager_mood`,
// `bribe_villager`, `rest_villager`, `unassign_villager`, `set_militia`, and
// `converse`, which runs a dialogue service and applies its mood effect.

use super::SimState;
use crate::building::BuildingStatus;
use crate::chronicle::ChronicleKey;
use crate::command::{ActionError, ActionOutcome};
use crate::dialogue::{DialogueContext, DialogueLine, DialogueReply, DialogueService, MoodEffect};
use crate::event::{SimEvent, SimEventKind};
use crate::mood::{self, Mood};
use crate::types::{Resource, VillagerId};
use crate::villager::{Assignment, roll_mood_timer};
use tracing::{debug, warn};

impl SimState {
    // -----------------------------------------------------------------------
    // Phase 1: mood, rest and movement
    // -----------------------------------------------------------------------

    pub(super) fn step_villagers(&mut self, events: &mut Vec<SimEvent>) {
        let overcrowded = self.is_overcrowded();
        let drain = 1 + if overcrowded {
            self.config.population.overcrowding_drain
        } else {
            0
        };
        let ids: Vec<VillagerId> = self.villagers.keys().copied().collect();

        for id in ids {
            let mut woke = None;
            let mut starts_feud = false;
            {
                let Some(v) = self.villagers.get_mut(&id) else {
                    continue;
                };
                if v.is_resting() {
                    v.rest_timer -= 1;
                    v.heal(self.config.combat.rest_regen);
                    if v.rest_timer == 0 {
                        v.mood = Mood::Happy;
                        v.mood_timer = roll_mood_timer(&self.config.villager, &mut self.rng);
                        woke = Some(v.name.clone());
                    }
                } else {
                    v.mood_timer = v.mood_timer.saturating_sub(drain);
                    if v.mood_timer == 0 {
                        let old = v.mood;
                        if overcrowded && v.mood == Mood::Happy {
                            v.mood = Mood::Tired;
                        } else {
                            let weights = self.config.personality(v.personality);
                            v.mood = mood::roll_mood_shift(&weights, &mut self.rng);
                        }
                        v.mood_timer = roll_mood_timer(&self.config.villager, &mut self.rng);
                        if v.mood != old {
                            events.push(SimEvent {
                                tick: self.tick,
                                kind: SimEventKind::MoodShifted { villager: id },
                            });
                        }
                        if v.mood == Mood::Feuding {
                            starts_feud = v.feud_target.is_none();
                        } else {
                            v.feud_target = None;
                        }
                    }
                }

                let speed = self.config.mood(v.mood).work_speed;
                v.advance_walk(self.config.villager.walk_step * speed);
                if v.has_arrived() && v.assignment.is_none() {
                    v.snap_to_target();
                }
            }

            if let Some(name) = woke {
                self.record(ChronicleKey::RestComplete, &[("villager", &name)], None);
                self.emit(events, SimEventKind::RestCompleted { villager: id });
            }
            if starts_feud {
                self.start_feud(id);
            }
        }
    }

    /// Pick a random rival for `id` and log the feud. Returns the rival.
    pub(super) fn start_feud(&mut self, id: VillagerId) -> Option<VillagerId> {
        let others: Vec<VillagerId> = self.villagers.keys().copied().filter(|o| *o != id).collect();
        let rival = self.rng.pick(&others).copied()?;
        if let Some(v) = self.villagers.get_mut(&id) {
            v.feud_target = Some(rival);
        }
        let name = self.villager_name(id);
        let target = self.villager_name(rival);
        self.record(
            ChronicleKey::Feud,
            &[("villager", &name), ("target", &target)],
            None,
        );
        Some(rival)
    }

    // -----------------------------------------------------------------------
    // Player mood actions
    // -----------------------------------------------------------------------

    /// Talk a villager one step up the improvement chain. Every attempt counts
    /// toward the refusal mercy rule, whether or not the mood moved.
    pub fn negotiate_with_villager(
        &mut self,
        id: VillagerId,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let v = self.villagers.get_mut(&id).ok_or(ActionError::NoVillager)?;
        v.negotiation_count += 1;
        let from = v.mood;
        let to = from.improved();
        v.mood = to;
        if to != Mood::Feuding {
            v.feud_target = None;
        }
        let name = v.name.clone();
        if from != to {
            self.record(
                ChronicleKey::Negotiation,
                &[
                    ("villager", &name),
                    ("old_mood", from.label()),
                    ("new_mood", to.label()),
                ],
                None,
            );
        }
        debug!(villager = %id, %from, %to, "negotiated");
        Ok(ActionOutcome::MoodChanged { from, to })
    }

    /// Push a villager one step down the decline chain. Landing on feuding
    /// picks a rival.
    pub fn worsen_villager_mood(&mut self, id: VillagerId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let v = self.villagers.get_mut(&id).ok_or(ActionError::NoVillager)?;
        let from = v.mood;
        let to = from.worsened();
        v.mood = to;
        let needs_rival = to == Mood::Feuding && v.feud_target.is_none();
        let name = v.name.clone();
        if from != to {
            self.record(
                ChronicleKey::MoodWorsened,
                &[
                    ("villager", &name),
                    ("old_mood", from.label()),
                    ("new_mood", to.label()),
                ],
                None,
            );
        }
        if needs_rival {
            self.start_feud(id);
        }
        debug!(villager = %id, %from, %to, "mood worsened");
        Ok(ActionOutcome::MoodChanged { from, to })
    }

    /// Pay gears for two improvement steps.
    pub fn bribe_villager(&mut self, id: VillagerId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        if !self.villagers.contains_key(&id) {
            return Err(ActionError::NoVillager);
        }
        let cost = self.config.villager.bribe_cost;
        self.ledger
            .try_spend(Resource::Gears, cost)
            .map_err(|_| ActionError::NoFunds)?;
        let v = self.villagers.get_mut(&id).ok_or(ActionError::NoVillager)?;
        let from = v.mood;
        let to = from.improved().improved();
        v.mood = to;
        if to != Mood::Feuding {
            v.feud_target = None;
        }
        let name = v.name.clone();
        self.record(
            ChronicleKey::Bribe,
            &[
                ("villager", &name),
                ("cost", &cost.to_string()),
                ("new_mood", to.label()),
            ],
            None,
        );
        debug!(villager = %id, %from, %to, "bribed");
        Ok(ActionOutcome::MoodChanged { from, to })
    }

    /// Send an idle villager to rest. Rest starts tired and ends happy.
    pub fn rest_villager(&mut self, id: VillagerId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let ticks = self.config.villager.rest_duration.max(1);
        let v = self.villagers.get_mut(&id).ok_or(ActionError::NoVillager)?;
        if v.is_resting() {
            return Err(ActionError::Resting);
        }
        if v.assignment.is_some() {
            return Err(ActionError::AlreadyBusy);
        }
        v.rest_timer = ticks;
        v.mood = Mood::Tired;
        v.feud_target = None;
        let name = v.name.clone();
        self.record(ChronicleKey::RestStart, &[("villager", &name)], None);
        debug!(villager = %id, ticks, "resting");
        Ok(ActionOutcome::Resting { ticks })
    }

    /// Drop a villager's assignment and send it home from wherever it
    /// currently stands. A villager mid-construction stays on the job.
    pub fn unassign_villager(&mut self, id: VillagerId) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        if !self.villagers.contains_key(&id) {
            return Err(ActionError::NoVillager);
        }
        if self.is_constructing(id) {
            return Err(ActionError::AlreadyBusy);
        }
        self.send_home(id);
        debug!(villager = %id, "unassigned");
        Ok(ActionOutcome::Unassigned)
    }

    /// Release the villager's assignment and start it walking home.
    pub(super) fn send_home(&mut self, id: VillagerId) {
        self.release_assignment(id);
        if let Some(v) = self.villagers.get_mut(&id) {
            v.release_home();
        }
    }

    /// Clear a villager's assignment without moving it. A building still
    /// waiting on this villager goes back to proposed; one already under
    /// construction keeps its progress and waits for a new worker.
    pub(super) fn release_assignment(&mut self, id: VillagerId) {
        let Some(v) = self.villagers.get_mut(&id) else {
            return;
        };
        let previous = v.assignment.take();
        v.harvest_timer = 0;
        let Some(Assignment::Building(bid)) = previous else {
            return;
        };
        if let Some(b) = self.buildings.get_mut(&bid) {
            if b.assigned_villager != Some(id) {
                return;
            }
            if b.status == BuildingStatus::Assigned {
                b.transition(BuildingStatus::Proposed);
            }
            b.assigned_villager = None;
        }
    }

    /// Draft or dismiss a villager. Dismissal ends any outpost siege duty and
    /// rally order. A builder mid-construction cannot be drafted.
    pub fn set_militia(
        &mut self,
        id: VillagerId,
        enlisted: bool,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_running()?;
        let v = self.villagers.get(&id).ok_or(ActionError::NoVillager)?;
        if enlisted && !v.is_militia && self.is_constructing(id) {
            return Err(ActionError::AlreadyBusy);
        }
        let on_outpost = v
            .assigned_node()
            .and_then(|nid| self.nodes.get(&nid))
            .is_some_and(|n| n.kind.is_outpost());
        if !enlisted && on_outpost {
            self.send_home(id);
        }
        if let Some(v) = self.villagers.get_mut(&id) {
            v.is_militia = enlisted;
            if !enlisted {
                v.rally_target = None;
                v.attack_cooldown = 0;
            }
        }
        debug!(villager = %id, enlisted, "militia status set");
        Ok(ActionOutcome::MilitiaSet { enlisted })
    }

    // -----------------------------------------------------------------------
    // Dialogue
    // -----------------------------------------------------------------------

    /// Build the context a dialogue service sees for this villager.
    pub fn dialogue_context(
        &self,
        id: VillagerId,
        history: &[DialogueLine],
    ) -> Option<DialogueContext> {
        let v = self.villagers.get(&id)?;
        Some(DialogueContext {
            name: v.name.clone(),
            role: v.role,
            mood: v.mood,
            personality: v.personality,
            feud_target_name: v.feud_target.map(|t| self.villager_name(t)),
            village_happiness: self.happiness,
            history: history.to_vec(),
        })
    }

    /// Send the player's message through a dialogue service and apply the
    /// reply's mood effect. A failing service yields a neutral reply.
    pub fn converse(
        &mut self,
        id: VillagerId,
        message: &str,
        history: &[DialogueLine],
        service: &mut dyn DialogueService,
    ) -> Result<DialogueReply, ActionError> {
        self.ensure_running()?;
        let context = self
            .dialogue_context(id, history)
            .ok_or(ActionError::NoVillager)?;
        let reply = match service.respond(&context, message) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(villager = %id, error = %err, "dialogue service failed; replying neutrally");
                DialogueReply::neutral()
            }
        };
        match reply.mood_effect {
            MoodEffect::Improve => {
                self.negotiate_with_villager(id)?;
            }
            MoodEffect::Worsen => {
                self.worsen_villager_mood(id)?;
            }
            MoodEffect::None => {}
        }
        Ok(reply)
    }
}
