//! Next-speaker selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::error::DiscussionError;

/// Source of uniform indices. Injected so selection can be made
/// deterministic.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..upper`. `upper` is never zero.
    fn index(&self, upper: usize) -> usize;
}

/// Thread-local RNG; the default for live discussions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Seeded RNG for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, upper: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..upper),
            Err(poisoned) => poisoned.into_inner().gen_range(0..upper),
        }
    }
}

/// Picks who speaks next, never the previous speaker.
pub struct TurnSelector {
    source: Box<dyn RandomSource>,
}

impl TurnSelector {
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Choose uniformly from `roster` minus `last_speaker`.
    pub fn next<'a>(&self, roster: &[&'a str], last_speaker: &str) -> Result<&'a str, DiscussionError> {
        let candidates: Vec<&'a str> = roster
            .iter()
            .copied()
            .filter(|name| *name != last_speaker)
            .collect();

        if candidates.is_empty() {
            return Err(DiscussionError::NoEligibleSpeaker {
                last_speaker: last_speaker.to_string(),
            });
        }

        let idx = self.source.index(candidates.len()).min(candidates.len() - 1);
        Ok(candidates[idx])
    }
}

impl Default for TurnSelector {
    fn default() -> Self {
        Self::new(ThreadRandom)
    }
}
