// Villager moods and personalities.
//
// A `Mood` is a villager's current behavioral state. Its numeric effects live
// in a data-driven `MoodProfile` table in `GameConfig`:
// - `work_speed` scales both construction progress and walking speed.
// - `refusal_chance` is the probability of refusing a work assignment.
// - `happiness_score` feeds the village happiness aggregate.
//
// A `Personality` is a fixed trait. Each personality owns a `MoodWeights`
// table; when a villager's mood timer expires, the next mood is drawn with
// probability proportional to these weights. Zero-weight moods are
// unreachable.
//
// Two fixed chains move a mood one step at a time:
// - improvement (negotiation, bribes): grumpy → tired → happy,
//   feuding → grumpy, lazy → tired.
// - decline (rude conversation): happy → tired → grumpy → feuding,
//   lazy → grumpy.
//
// See also: `sim/agents.rs` for the per-tick mood roll and the player-facing
// mood actions, `config.rs` for the default tables.

use crate::prng::GameRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A villager's current mood.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Tired,
    Grumpy,
    Lazy,
    Feuding,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Happy, Mood::Tired, Mood::Grumpy, Mood::Lazy, Mood::Feuding];

    /// One step along the improvement chain.
    pub fn improved(self) -> Mood {
        match self {
            Mood::Happy => Mood::Happy,
            Mood::Tired => Mood::Happy,
            Mood::Grumpy => Mood::Tired,
            Mood::Lazy => Mood::Tired,
            Mood::Feuding => Mood::Grumpy,
        }
    }

    /// One step along the decline chain.
    pub fn worsened(self) -> Mood {
        match self {
            Mood::Happy => Mood::Tired,
            Mood::Tired => Mood::Grumpy,
            Mood::Grumpy => Mood::Feuding,
            Mood::Lazy => Mood::Grumpy,
            Mood::Feuding => Mood::Feuding,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Tired => "tired",
            Mood::Grumpy => "grumpy",
            Mood::Lazy => "lazy",
            Mood::Feuding => "feuding",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric effects of a mood.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodProfile {
    /// Multiplier on construction progress and walking speed.
    pub work_speed: f32,
    /// Probability in [0, 1] of refusing an assignment.
    pub refusal_chance: f64,
    /// Contribution to village happiness (0-100).
    pub happiness_score: u32,
}

/// A fixed villager trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Diligent,
    Lazy,
    Hothead,
    Cheerful,
}

impl Personality {
    pub const ALL: [Personality; 4] = [
        Personality::Diligent,
        Personality::Lazy,
        Personality::Hothead,
        Personality::Cheerful,
    ];
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Personality::Diligent => "diligent",
            Personality::Lazy => "lazy",
            Personality::Hothead => "hothead",
            Personality::Cheerful => "cheerful",
        };
        f.write_str(label)
    }
}

/// Relative likelihood of each mood when a personality rolls a mood shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodWeights {
    pub happy: u32,
    pub tired: u32,
    pub grumpy: u32,
    pub lazy: u32,
    pub feuding: u32,
}

impl MoodWeights {
    pub const fn new(happy: u32, tired: u32, grumpy: u32, lazy: u32, feuding: u32) -> Self {
        Self {
            happy,
            tired,
            grumpy,
            lazy,
            feuding,
        }
    }

    /// Weights in `Mood::ALL` order.
    pub fn as_array(&self) -> [u32; 5] {
        [self.happy, self.tired, self.grumpy, self.lazy, self.feuding]
    }
}

/// Draw the next mood from a personality's weight table.
///
/// Falls back to `Happy` when every weight is zero.
pub fn roll_mood_shift(weights: &MoodWeights, rng: &mut GameRng) -> Mood {
    rng.weighted_index(&weights.as_array())
        .map(|idx| Mood::ALL[idx])
        .unwrap_or(Mood::Happy)
}
