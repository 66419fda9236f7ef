/*!

Seed derivation. Every random stream in a run is a `StdRng` seeded from the run's global seed
and the coordinates of the work that consumes it, so results do not depend on which thread
picks up which block or in what order blocks finish.

*/

use rand::{SeedableRng, rngs::StdRng};
use rustc_hash::FxHasher;
use std::hash::Hasher;

pub type SimRng = StdRng;

/// Label mixed into the seed of the stream used to place initial infections.
const INITIALIZATION_STREAM: &str = "initialization";

/// Derives the seed for block `block` on day `day`.
#[must_use]
pub fn derive_seed(global_seed: u64, day: u32, block: usize) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(global_seed);
    hasher.write_u32(day);
    hasher.write_usize(block);
    hasher.finish()
}

/// The generator for block `block` on day `day`. The sequential engine is block 0.
#[must_use]
pub fn block_rng(global_seed: u64, day: u32, block: usize) -> SimRng {
    SimRng::seed_from_u64(derive_seed(global_seed, day, block))
}

/// The generator used to scatter the initial infections.
#[must_use]
pub fn initialization_rng(global_seed: u64) -> SimRng {
    let mut hasher = FxHasher::default();
    hasher.write(INITIALIZATION_STREAM.as_bytes());
    SimRng::seed_from_u64(global_seed.wrapping_add(hasher.finish()))
}
