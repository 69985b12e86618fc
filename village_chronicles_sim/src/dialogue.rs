// Dialogue contract between the simulation and a text generator.
//
// The sim does not care how a villager's words are produced. It hands a
// `DialogueService` a `DialogueContext` (who is speaking, in what mood, how
// the village is doing, what has been said) plus the player's message, and
// gets back a `DialogueReply`: the text and a `MoodEffect`. The effect is the
// only part the sim acts on: `improve` and `worsen` run the same mood chains
// as negotiation and rude conversation.
//
// Services can fail (network, malformed output). `SimState::converse`
// converts any `DialogueError` into a neutral reply with no mood effect, so
// a broken generator never blocks play.
//
// Model-backed services are expected to end their raw output with a tag
// like `[MOOD:improve]`; `parse_mood_tag` splits it off. `system_prompt`
// renders the character brief such a service would send.
//
// `ScriptedDialogue` is a deterministic in-process service with canned,
// mood-keyed lines and a keyword reading of the player's tone.
//
// See also: `sim/agents.rs` for `SimState::converse`.

use crate::mood::{Mood, Personality};
use crate::types::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodEffect {
    Improve,
    Worsen,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Player,
    Villager,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

/// Everything a service may use to voice a villager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    pub name: String,
    pub role: Role,
    pub mood: Mood,
    pub personality: Personality,
    pub feud_target_name: Option<String>,
    pub village_happiness: u32,
    pub history: Vec<DialogueLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueReply {
    pub text: String,
    pub mood_effect: MoodEffect,
}

impl DialogueReply {
    /// The fallback used when a service fails.
    pub fn neutral() -> Self {
        Self {
            text: "...".to_string(),
            mood_effect: MoodEffect::None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("dialogue service unavailable: {0}")]
    Unavailable(String),
    #[error("dialogue service returned an empty reply")]
    EmptyReply,
}

pub trait DialogueService {
    fn respond(
        &mut self,
        context: &DialogueContext,
        message: &str,
    ) -> Result<DialogueReply, DialogueError>;
}

/// Split a trailing `[MOOD:improve|worsen|none]` tag off raw model output.
/// Text without a valid trailing tag is returned whole with no effect.
pub fn parse_mood_tag(raw: &str) -> DialogueReply {
    let trimmed = raw.trim_end();
    let tagged = trimmed.strip_suffix(']').and_then(|body| {
        let start = body.rfind("[MOOD:")?;
        let effect = match &body[start + "[MOOD:".len()..] {
            "improve" => MoodEffect::Improve,
            "worsen" => MoodEffect::Worsen,
            "none" => MoodEffect::None,
            _ => return None,
        };
        Some((start, effect))
    });
    match tagged {
        Some((start, mood_effect)) => DialogueReply {
            text: trimmed[..start].trim().to_string(),
            mood_effect,
        },
        None => DialogueReply {
            text: raw.trim().to_string(),
            mood_effect: MoodEffect::None,
        },
    }
}

/// Character brief for a model-backed service.
pub fn system_prompt(context: &DialogueContext) -> String {
    let feud = match &context.feud_target_name {
        Some(name) => format!("You are in a bitter feud with {name}. It colors everything you say.\n"),
        None => String::new(),
    };
    format!(
        "You are {name}, the village {role} of a steam-powered frontier settlement.\n\
         Personality: {personality}. Current mood: {mood}. Village happiness: {happiness}/100.\n\
         {feud}\
         Answer in one to three sentences, in character.\n\
         End with one line holding exactly one tag: [MOOD:improve] if the player was kind or \
         persuasive, [MOOD:worsen] if rude or demanding, [MOOD:none] otherwise.",
        name = context.name,
        role = context.role,
        personality = context.personality,
        mood = context.mood,
        happiness = context.village_happiness,
    )
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

const KIND_WORDS: &[&str] = &[
    "thank", "please", "sorry", "great", "well done", "appreciate", "proud", "earned", "help",
];
const RUDE_WORDS: &[&str] = &[
    "lazy", "useless", "hurry", "idiot", "pathetic", "worthless", "shut up", "get to work",
];

/// Deterministic, offline dialogue.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDialogue {
    turn: usize,
}

impl ScriptedDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines(mood: Mood) -> &'static [&'static str] {
        match mood {
            Mood::Happy => &[
                "Another gear turns! This place runs like a well-oiled engine.",
                "Mind the steam pipes, friend. Lost my eyebrows twice this month.",
                "Fine day for building, wouldn't you say?",
            ],
            Mood::Tired => &[
                "I could sleep for a week inside a boiler.",
                "Give me a moment... my arms feel like lead.",
            ],
            Mood::Grumpy => &[
                "What now? Can't you see I'm busy?",
                "If one more valve bursts I'm moving to the next valley.",
            ],
            Mood::Lazy => &[
                "Work? Today? Bold of you to ask.",
                "The forge won't run away. Neither will I, unfortunately.",
            ],
            Mood::Feuding => &[
                "Don't talk to me while that rat is still in this village.",
                "I'll work when justice is done and not a moment before.",
            ],
        }
    }

    fn read_tone(message: &str) -> MoodEffect {
        let lower = message.to_lowercase();
        if RUDE_WORDS.iter().any(|w| lower.contains(w)) {
            MoodEffect::Worsen
        } else if KIND_WORDS.iter().any(|w| lower.contains(w)) {
            MoodEffect::Improve
        } else {
            MoodEffect::None
        }
    }
}

impl DialogueService for ScriptedDialogue {
    fn respond(
        &mut self,
        context: &DialogueContext,
        message: &str,
    ) -> Result<DialogueReply, DialogueError> {
        let lines = Self::lines(context.mood);
        let text = lines
            .get(self.turn % lines.len().max(1))
            .ok_or(DialogueError::EmptyReply)?;
        self.turn += 1;
        Ok(DialogueReply {
            text: text.to_string(),
            mood_effect: Self::read_tone(message),
        })
    }
}
