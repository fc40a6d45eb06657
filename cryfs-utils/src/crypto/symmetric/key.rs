//! Symmetric key material.

use std::fmt;

use zeroize::Zeroizing;

use crate::random::RandomGenerator;

use super::InvalidKeySize;

/// A symmetric encryption key. The backing memory is wiped on drop.
///
/// Keys are variable-length at this level; each [`super::Cipher`] checks the
/// length it needs at construction time.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl EncryptionKey {
    pub fn from_bytes(bytes: Vec<u8>) -> EncryptionKey {
        EncryptionKey {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Fresh key of `size` bytes from the given randomness source.
    pub fn generate(rng: &dyn RandomGenerator, size: usize) -> EncryptionKey {
        let mut bytes = Zeroizing::new(vec![0u8; size]);
        rng.fill(&mut bytes);
        EncryptionKey { bytes }
    }

    /// Parse from hex. The hex string length determines the key size.
    pub fn from_hex(hex_str: &str) -> Result<EncryptionKey, hex::FromHexError> {
        Ok(EncryptionKey {
            bytes: Zeroizing::new(hex::decode(hex_str)?),
        })
    }

    /// Uppercase hex encoding, e.g. for storing in a config record.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.bytes.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the key has `expected` bytes, for cipher constructors.
    pub(crate) fn check_size(&self, expected: usize) -> Result<(), InvalidKeySize> {
        if self.len() != expected {
            return Err(InvalidKeySize {
                expected,
                actual: self.len(),
            });
        }
        Ok(())
    }
}

// Key material must not leak into logs.
impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({} bytes)", self.len())
    }
}
