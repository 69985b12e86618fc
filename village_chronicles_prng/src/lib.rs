// Deterministic, portable pseudo-random number generator for the settlement.
//
// xoshiro256++ (Blackman & Vigna, 2019), seeded through SplitMix64. The
// generator state is four `u64` words and derives serde, so it is saved and
// restored as part of the world snapshot: a restored world continues the
// exact random stream it would have produced without the save boundary.
//
// On top of the raw stream this crate provides the draws the simulation
// actually makes:
// - `chance(p)` for refusal checks, spawn rolls and event rolls.
// - `weighted_index(weights)` for personality-driven mood shifts. Zero-weight
//   entries are never selected.
// - `pick(slice)` for chronicle template choice and random targeting.
// - `range_*` helpers for mood timers and node placement.
//
// **Critical constraint: determinism.** The same seed and the same call
// sequence must give the same results on every platform. The core generator
// uses integer arithmetic only. Floating-point values are derived from the
// upper bits of a `u64`, never accumulated.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG. The only source of randomness in the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// SplitMix64 expands the seed into the 256-bit state, so nearby seeds
    /// (0, 1, 2, ...) still give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo
    /// bias. Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `u32` in `[low, high)`. Panics if `low >= high`.
    pub fn range_u32(&mut self, low: u32, high: u32) -> u32 {
        self.range_u64(low as u64, high as u64) as u32
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` is always false and `p >= 1.0` is always true, because the
    /// underlying draw lies in [0, 1).
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Entries with weight 0 can never be returned. Returns `None` when the
    /// slice is empty or every weight is 0.
    pub fn weighted_index(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.range_u64(0, total);
        for (i, &w) in weights.iter().enumerate() {
            let w = w as u64;
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        None
    }

    /// Pick a uniformly random element. `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
