//! OS and pseudo randomness behind an object-safe trait.
//!
//! [`OsRandom`] draws from the operating system on every call and is used
//! for long-lived key material. [`PseudoRandom`] is a process-global
//! ChaCha20 pool seeded once from the OS; it is cheap enough for block ids
//! and IVs, which are needed on every write path.

use std::sync::{Mutex, OnceLock};

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use crate::data::Data;

/// Source of random bytes. Object-safe so tests can substitute a
/// deterministic fake.
pub trait RandomGenerator: Send + Sync {
    fn fill(&self, target: &mut [u8]);

    fn bytes(&self, size: usize) -> Data {
        let mut result = Data::new_zeroed(size);
        self.fill(result.as_mut_slice());
        result
    }
}

// ---------------------------------------------------------------------------
// OS randomness
// ---------------------------------------------------------------------------

/// Cryptographically strong randomness straight from the operating system.
pub struct OsRandom;

impl RandomGenerator for OsRandom {
    fn fill(&self, target: &mut [u8]) {
        // The OS RNG failing is unrecoverable for a crypto application.
        getrandom::getrandom(target).expect("OS random source failed");
    }
}

// ---------------------------------------------------------------------------
// Pseudo randomness
// ---------------------------------------------------------------------------

/// Process-global ChaCha20 pool, seeded from the OS on first use.
pub struct PseudoRandom;

fn pool() -> &'static Mutex<ChaCha20Rng> {
    static POOL: OnceLock<Mutex<ChaCha20Rng>> = OnceLock::new();
    POOL.get_or_init(|| {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).expect("OS random source failed");
        Mutex::new(ChaCha20Rng::from_seed(seed))
    })
}

impl RandomGenerator for PseudoRandom {
    fn fill(&self, target: &mut [u8]) {
        pool().lock().unwrap().fill_bytes(target);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
