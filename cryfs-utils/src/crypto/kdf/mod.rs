//! Password-based key derivation.

mod params;
mod scrypt_kdf;

pub use params::{ScryptParams, ScryptSettings};
pub use scrypt_kdf::Scrypt;

use std::fmt;

use crate::data::{Data, SerializationError};

use super::symmetric::EncryptionKey;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum KdfError {
    /// The KDF parameters are outside the algorithm's domain (e.g. an N
    /// that is not a power of two).
    InvalidParameters,
    /// The serialized parameter blob could not be parsed.
    InvalidSerializedParameters(SerializationError),
    /// The KDF itself failed (e.g. allocation failure).
    DerivationFailed,
}

impl fmt::Display for KdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters => write!(f, "invalid kdf parameters"),
            Self::InvalidSerializedParameters(err) => {
                write!(f, "invalid serialized kdf parameters: {}", err)
            }
            Self::DerivationFailed => write!(f, "key derivation failed"),
        }
    }
}

impl std::error::Error for KdfError {}

impl From<SerializationError> for KdfError {
    fn from(err: SerializationError) -> Self {
        Self::InvalidSerializedParameters(err)
    }
}

// ---------------------------------------------------------------------------
// KDF contract
// ---------------------------------------------------------------------------

/// A freshly derived key together with the serialized parameters needed to
/// re-derive it from the same password later.
pub struct DerivedKey {
    pub key: EncryptionKey,
    pub serialized_params: Data,
}

/// Password-based key derivation function.
///
/// `derive_existing_key` is deterministic for equal inputs. A wrong password
/// yields a different key, which then fails the outer cipher's
/// authentication — that is how "wrong password" surfaces.
pub trait PasswordBasedKdf: Send + Sync {
    /// Derive a key with fresh parameters (in particular a fresh salt).
    fn derive_new_key(&self, key_size: usize, password: &str) -> Result<DerivedKey, KdfError>;

    /// Re-derive a key from stored parameters.
    fn derive_existing_key(
        &self,
        key_size: usize,
        password: &str,
        serialized_params: &[u8],
    ) -> Result<EncryptionKey, KdfError>;
}
