//! Deterministic test payloads.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use super::{Data, FixedSizeData};

/// Generates reproducible pseudorandom byte sequences for tests. The same
/// `(size, seed)` pair always yields the same bytes.
pub struct DataFixture;

impl DataFixture {
    pub fn generate(size: usize, seed: u64) -> Data {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut data = Data::new_zeroed(size);
        rng.fill_bytes(data.as_mut_slice());
        data
    }

    pub fn generate_fixed_size<const N: usize>(seed: u64) -> FixedSizeData<N> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut bytes = [0u8; N];
        rng.fill_bytes(&mut bytes);
        FixedSizeData::from_array(bytes)
    }
}
