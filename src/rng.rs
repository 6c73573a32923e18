use rand::RngCore;

use crate::constants::engine::ROUND_SEED_OFFSET;
use crate::hash::stable_hash_with;
use crate::types::RoundIndex;
use std::hash::Hash;

/// Small deterministic splitmix RNG used for reproducible random draws.
///
/// Rounds derive their generator from `(seed, round)`, so a resumed
/// experiment replays the same draws without persisting RNG state.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// Create a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive the generator for one round from the experiment seed.
    pub fn for_round(seed: u64, round: RoundIndex) -> Self {
        let state = stable_hash_with(|hasher| {
            seed.hash(hasher);
            ROUND_SEED_OFFSET.hash(hasher);
            round.hash(hasher);
        });
        Self::new(state)
    }

    /// Advance the splitmix64 state and mix it into one output word.
    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut word = self.state;
        word = (word ^ (word >> 30)).wrapping_mul(MIX_MUL_1);
        word = (word ^ (word >> 27)).wrapping_mul(MIX_MUL_2);
        word ^ (word >> 31)
    }
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_MUL_1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_MUL_2: u64 = 0x94D0_49BB_1331_11EB;

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let word = self.step().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }
}
