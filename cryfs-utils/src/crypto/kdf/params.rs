//! Scrypt parameter sets and their serialized form.

use crate::data::{Data, Deserializer, SerializationError, Serializer};

// ---------------------------------------------------------------------------
// Settings presets
// ---------------------------------------------------------------------------

/// Cost settings for deriving a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptSettings {
    pub salt_len: usize,
    /// CPU/memory cost, as log2(N).
    pub log_n: u8,
    /// Block size factor.
    pub r: u32,
    /// Parallelization factor.
    pub p: u32,
}

impl ScryptSettings {
    pub const DEFAULT: ScryptSettings = ScryptSettings {
        salt_len: 32,
        log_n: 19,
        r: 1,
        p: 1,
    };

    pub const PARANOID: ScryptSettings = ScryptSettings {
        salt_len: 32,
        log_n: 20,
        r: 8,
        p: 16,
    };

    /// Fast settings for test suites. Never use for real filesystems.
    pub const TEST: ScryptSettings = ScryptSettings {
        salt_len: 32,
        log_n: 10,
        r: 1,
        p: 1,
    };
}

// ---------------------------------------------------------------------------
// Persisted parameters
// ---------------------------------------------------------------------------

/// The `(salt, N, r, p)` tuple stored next to the ciphertext so the same
/// password derives the same key on reopen.
///
/// Serialized layout: `[ u64 salt_len | salt | u64 N | u32 r | u32 p ]`.
#[derive(Debug, PartialEq, Eq)]
pub struct ScryptParams {
    salt: Data,
    n: u64,
    r: u32,
    p: u32,
}

impl ScryptParams {
    pub fn new(salt: Data, n: u64, r: u32, p: u32) -> ScryptParams {
        ScryptParams { salt, n, r, p }
    }

    pub fn salt(&self) -> &[u8] {
        self.salt.as_slice()
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    /// log2(N), or `None` if N is not a power of two greater than one.
    pub fn log_n(&self) -> Option<u8> {
        if self.n.is_power_of_two() && self.n > 1 {
            Some(self.n.trailing_zeros() as u8)
        } else {
            None
        }
    }

    pub fn serialize(&self) -> Data {
        let size = Serializer::data_size(&self.salt) + 8 + 4 + 4;
        let mut serializer = Serializer::new(size);
        // Writes into a correctly presized buffer cannot fail.
        serializer.write_data(&self.salt).unwrap();
        serializer.write_u64(self.n).unwrap();
        serializer.write_u32(self.r).unwrap();
        serializer.write_u32(self.p).unwrap();
        serializer.finished().unwrap()
    }

    pub fn deserialize(source: &[u8]) -> Result<ScryptParams, SerializationError> {
        let mut deserializer = Deserializer::new(source);
        let salt = deserializer.read_data()?;
        let n = deserializer.read_u64()?;
        let r = deserializer.read_u32()?;
        let p = deserializer.read_u32()?;
        deserializer.finished()?;
        Ok(ScryptParams { salt, n, r, p })
    }
}
