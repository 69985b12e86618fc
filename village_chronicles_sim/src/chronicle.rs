// The chronicle: an append-only narrative log of settlement milestones.
//
// Entries are write-only output. The simulation appends to the log but never
// reads it back, so nothing in the rules depends on chronicle contents.
//
// Each `ChronicleKey` has a small pool of text templates. A template is
// picked with the sim's RNG and its `{placeholders}` are filled from
// caller-supplied pairs (`{villager}`, `{building}`, `{target}`, `{mood}`,
// `{old_mood}`, `{new_mood}`, `{cost}`, `{event}`, `{count}`). Unknown
// placeholders are left as written.
//
// Timestamps are simulation ticks. There is no wall clock in the sim.

use crate::building::BuildingKind;
use crate::mood::Mood;
use crate::prng::GameRng;
use crate::types::{ChronicleId, IdAllocator};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChronicleKey {
    Proposed,
    Assigned,
    Refusal,
    Negotiation,
    MoodWorsened,
    Bribe,
    RestStart,
    RestComplete,
    Completion(Mood),
    Upgrade,
    Milestone,
    TradeBoost,
    Feud,
    RandomEvent,
    Festival,
    Raid,
    BuildingDestroyed,
    VillagerDied,
    OutpostFallen,
    WandererArrived,
    WandererAccepted,
    WandererRejected,
    PlotUnlocked,
    GameOver,
}

impl ChronicleKey {
    pub fn templates(self) -> &'static [&'static str] {
        match self {
            ChronicleKey::Proposed => &[
                "Plans for a {building} are pinned to the council board. A willing pair of hands is wanted.",
                "The council proposes a {building}. Who will take up the hammer?",
            ],
            ChronicleKey::Assigned => &[
                "{villager} shoulders a toolbox and sets off to raise the {building}.",
                "{villager} agrees to build the {building} and marches to the site.",
            ],
            ChronicleKey::Refusal => &[
                "{villager} flatly refuses to touch the {building}. A {mood} mood is hard to argue with.",
                "The {building} will wait: {villager} is far too {mood} to work today.",
            ],
            ChronicleKey::Negotiation => &[
                "A patient word lifts {villager}'s spirits from {old_mood} to {new_mood}.",
                "After a long talk over tea, {villager} feels {new_mood} rather than {old_mood}.",
            ],
            ChronicleKey::MoodWorsened => &[
                "Sharp words leave {villager} {new_mood} where once they were {old_mood}.",
                "The conversation sours. {villager} stalks off, now thoroughly {new_mood}.",
            ],
            ChronicleKey::Bribe => &[
                "{cost} gears change hands and {villager} is suddenly {new_mood}.",
                "A purse of {cost} gears works wonders. {villager} grins, {new_mood} at last.",
            ],
            ChronicleKey::RestStart => &[
                "{villager} is sent to rest. The village will manage a while without them.",
                "{villager} draws the curtains and sleeps off the weariness.",
            ],
            ChronicleKey::RestComplete => &[
                "{villager} returns from rest bright-eyed and ready for duty.",
                "Well rested, {villager} is back on their feet and smiling.",
            ],
            ChronicleKey::Completion(Mood::Happy) => &[
                "{villager} whistles while fitting the last rivet. The {building} stands complete.",
                "With a broad grin, {villager} finishes the {building}. Happy hands build well.",
            ],
            ChronicleKey::Completion(Mood::Tired) => &[
                "{villager} slumps against the finished {building}, spent but proud.",
                "Yawning through the last bolt, {villager} completes the {building}.",
            ],
            ChronicleKey::Completion(Mood::Grumpy) => &[
                "{villager} finishes the {building} with a scowl and a slammed door.",
                "The {building} is done. {villager} would rather not talk about it.",
            ],
            ChronicleKey::Completion(Mood::Lazy) => &[
                "At long last, {villager} finishes the {building}. Eventually counts.",
                "{villager} stretches beside the completed {building}, already planning a nap.",
            ],
            ChronicleKey::Completion(Mood::Feuding) => &[
                "{villager} finishes the {building} out of pure spite. It is sturdy all the same.",
                "Muttering about rivals, {villager} completes the {building}.",
            ],
            ChronicleKey::Upgrade => &[
                "Fresh blueprints carry the {building} to level {count}.",
            ],
            ChronicleKey::Milestone => &[
                "{count} structures now stand where there was only scrub. The settlement grows.",
            ],
            ChronicleKey::TradeBoost => &[
                "An airship moors at the dock. For a blessed while, every workshop runs double.",
            ],
            ChronicleKey::Feud => &[
                "{villager} and {target} trade insults across the square. A feud has begun.",
                "Old grudges flare: {villager} will not share a bench with {target}.",
            ],
            ChronicleKey::RandomEvent => &[
                "Strange winds blow through the settlement: {event}!",
                "The chronicler scribbles in haste: {event}!",
            ],
            ChronicleKey::Festival => &[
                "A spontaneous festival fills the square. Every frown melts away.",
            ],
            ChronicleKey::Raid => &[
                "Raiders, {count} strong, creep over the ridge.",
                "Alarm bells! {count} raiders approach the village.",
            ],
            ChronicleKey::BuildingDestroyed => &[
                "The {building} collapses under the raiders' blows.",
            ],
            ChronicleKey::VillagerDied => &[
                "{villager} has fallen. The village mourns.",
            ],
            ChronicleKey::OutpostFallen => &[
                "The raider outpost falls to the militia. Its hoard is carried home in triumph.",
            ],
            ChronicleKey::WandererArrived => &[
                "A traveller named {villager} waits at the village edge, asking to stay.",
            ],
            ChronicleKey::WandererAccepted => &[
                "{villager} is welcomed into the village.",
            ],
            ChronicleKey::WandererRejected => &[
                "{villager} is turned away and trudges on down the road.",
            ],
            ChronicleKey::PlotUnlocked => &[
                "Surveyors stake out new land. The village reaches past its old fences.",
            ],
            ChronicleKey::GameOver => &[
                "The last lamp goes out. The village is no more.",
            ],
        }
    }
}

/// One chronicle entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChronicleEvent {
    pub id: ChronicleId,
    pub text: String,
    /// Simulation tick the entry was written on.
    pub tick: u64,
    pub building: Option<BuildingKind>,
}

/// Replace every `{key}` in `template` with its value.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut text = template.to_string();
    for (key, value) in vars {
        text = text.replace(&format!("{{{key}}}"), value);
    }
    text
}

/// Pick a template for `key` and render it into a new entry.
pub fn compose(
    ids: &mut IdAllocator,
    rng: &mut GameRng,
    tick: u64,
    key: ChronicleKey,
    vars: &[(&str, &str)],
    building: Option<BuildingKind>,
) -> ChronicleEvent {
    let template = rng.pick(key.templates()).copied().unwrap_or("");
    ChronicleEvent {
        id: ids.chronicle(),
        text: render(template, vars),
        tick,
        building,
    }
}
