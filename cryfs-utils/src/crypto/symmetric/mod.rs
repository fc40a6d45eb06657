//! The symmetric cipher family.
//!
//! Every cipher is a block-cipher/mode combination with a fixed key size and
//! compile-time size relations between plaintext and ciphertext. GCM
//! variants are authenticated: decryption fails on any modified byte. CFB
//! variants are NOT authenticated — they detect no tampering whatsoever and
//! are offered for compatibility only; see the note on [`CfbCipher`].

mod cfb;
mod ciphers;
mod gcm;
mod key;

pub use cfb::CfbCipher;
pub use ciphers::{
    lookup_cipher, Aes128Cfb, Aes128Gcm, Aes256Cfb, Aes256Gcm, Cast256Cfb, Cast256Gcm,
    CipherDescription, Serpent256Cfb, Serpent256Gcm, Twofish256Cfb, Twofish256Gcm, ALL_CIPHERS,
};
pub use gcm::GcmCipher;
pub use key::EncryptionKey;

use std::fmt;

use crate::data::Data;
use crate::random::RandomGenerator;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The key handed to [`Cipher::new`] has the wrong length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeySize {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidKeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid key size: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidKeySize {}

/// Encryption-side failure. Decryption failures are deliberately not an
/// error type: `decrypt` returns `None` so callers cannot distinguish why a
/// ciphertext was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherError;

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cipher operation failed")
    }
}

impl std::error::Error for CipherError {}

// ---------------------------------------------------------------------------
// Cipher contract
// ---------------------------------------------------------------------------

/// A symmetric cipher with a fixed key size.
///
/// `encrypt` draws a fresh IV on every call, so encrypting equal plaintexts
/// under the same key yields different ciphertexts.
pub trait Cipher: Send + Sync + Sized + 'static {
    /// Key size in bytes.
    const KEY_SIZE: usize;

    fn new(key: EncryptionKey) -> Result<Self, InvalidKeySize>;

    /// Size of the ciphertext for a plaintext of `plaintext_size` bytes.
    fn ciphertext_size(plaintext_size: usize) -> usize;

    /// Size of the plaintext for a ciphertext of `ciphertext_size` bytes.
    /// `None` if the ciphertext is shorter than the cipher's overhead.
    fn plaintext_size(ciphertext_size: usize) -> Option<usize>;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Data, CipherError>;

    /// `None` on any integrity failure (authenticated ciphers) or
    /// truncation below the IV size.
    fn decrypt(&self, ciphertext: &[u8]) -> Option<Data>;

    /// A fresh key of this cipher's size from the given randomness source.
    fn create_key(rng: &dyn RandomGenerator) -> EncryptionKey {
        EncryptionKey::generate(rng, Self::KEY_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Tests (shared across all cipher instantiations)
// ---------------------------------------------------------------------------
