//! Internal record ids: short, random, collision-checked.
//!
//! Internal ids are independent of any external id so that directory names
//! stay short while foreign ids can be arbitrarily long.

use rand::Rng;
use std::collections::HashSet;

/// Length of a generated internal id.
pub const ID_LEN: usize = 7;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Hands out ids that are unique against a known set.
///
/// Every id returned is added to the known set, so ids allocated for dry-run
/// previews never collide with ids allocated later in the same run.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    #[must_use]
    pub fn new<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            taken: existing.into_iter().collect(),
        }
    }

    /// Mark an id as used without generating it.
    pub fn reserve(&mut self, id: impl Into<String>) {
        self.taken.insert(id.into());
    }

    #[must_use]
    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Draw a fresh id from the thread-local RNG.
    pub fn allocate(&mut self) -> String {
        self.allocate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh id from the given RNG.
    pub fn allocate_with(&mut self, rng: &mut impl Rng) -> String {
        loop {
            let candidate = random_id(rng);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn random_id(rng: &mut impl Rng) -> String {
    (0..ID_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
