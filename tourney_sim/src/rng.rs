//! Deterministic random stream used by every stage of a simulated tournament.
//!
//! The generator is a plain linear-congruential generator so that a seed
//! reproduces the exact same draw sequence on every platform:
//!
//! ```text
//! state = (state * 9301 + 49297) mod 233280
//! value = state / 233280
//! ```

use serde::{Deserialize, Serialize};

/// LCG multiplier
pub const LCG_MULTIPLIER: u64 = 9301;

/// LCG increment
pub const LCG_INCREMENT: u64 = 49297;

/// LCG modulus, also the number of distinct states
pub const LCG_MODULUS: u64 = 233_280;

/// Seeded linear-congruential generator
///
/// One instance belongs to exactly one driver. Sequential batches thread a
/// single instance through every run; parallel batches give each trial its
/// own instance via [`derive_trial_seed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lcg {
    state: u64,
    draws: u64,
}

impl Lcg {
    /// Create a generator from a seed
    pub fn new(seed: u32) -> Self {
        Self {
            state: u64::from(seed),
            draws: 0,
        }
    }

    /// Current raw state
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Number of values drawn so far
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Next value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.draws += 1;
        self.state as f64 / LCG_MODULUS as f64
    }

    /// Uniform index in `0..bound`
    pub fn next_index(&mut self, bound: usize) -> usize {
        // next_f64 < 1.0, so the product never reaches bound
        (self.next_f64() * bound as f64).floor() as usize
    }

    /// Fisher-Yates shuffle of a copy of `items`
    ///
    /// Walks from the back, drawing one swap index per position.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut shuffled = items.to_vec();
        for i in (1..shuffled.len()).rev() {
            let j = self.next_index(i + 1);
            shuffled.swap(i, j);
        }
        shuffled
    }
}

/// Derive the seed of one trial of a parallel batch
///
/// Mixes the base seed with the trial index through the SplitMix64 finalizer
/// and folds the result into the LCG state space. The mapping is pure, so a
/// trial replays identically no matter which worker runs it.
pub fn derive_trial_seed(base_seed: u32, trial_index: usize) -> u32 {
    let mut z = (u64::from(base_seed) << 32) ^ (trial_index as u64);
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    (z % LCG_MODULUS) as u32
}
