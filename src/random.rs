// Injectable randomness for tie-breaking decisions

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks an index in `0..len`; callers never pass `len == 0`
pub trait RandomSource {
    fn pick(&mut self, len: usize) -> usize;
}

impl RandomSource for StdRng {
    fn pick(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Always returns the same index (clamped to the slice), for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedPick(pub usize);

impl RandomSource for FixedPick {
    fn pick(&mut self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

/// Uniform choice over a slice
pub fn choose<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.pick(items.len()))
}

/// Seeded generator when a seed is configured, OS entropy otherwise
pub fn session_rng(seed: Option<u64>, agent: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(agent as u64)),
        None => StdRng::from_os_rng(),
    }
}
