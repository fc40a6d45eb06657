//! Scrypt-based key derivation.

use scrypt::Params;
use zeroize::Zeroizing;

use crate::crypto::symmetric::EncryptionKey;
use crate::data::Data;
use crate::random::{OsRandom, RandomGenerator};

use super::{DerivedKey, KdfError, PasswordBasedKdf, ScryptParams, ScryptSettings};

/// Scrypt KDF with a fixed settings preset for newly derived keys.
pub struct Scrypt {
    settings: ScryptSettings,
}

impl Scrypt {
    pub fn new(settings: ScryptSettings) -> Scrypt {
        Scrypt { settings }
    }

    fn derive(
        key_size: usize,
        password: &str,
        params: &ScryptParams,
    ) -> Result<EncryptionKey, KdfError> {
        let log_n = params.log_n().ok_or(KdfError::InvalidParameters)?;
        let scrypt_params = Params::new(log_n, params.r(), params.p(), key_size)
            .map_err(|_| KdfError::InvalidParameters)?;
        let mut key = Zeroizing::new(vec![0u8; key_size]);
        scrypt::scrypt(password.as_bytes(), params.salt(), &scrypt_params, &mut key)
            .map_err(|_| KdfError::DerivationFailed)?;
        Ok(EncryptionKey::from_bytes(key.to_vec()))
    }
}

impl Default for Scrypt {
    fn default() -> Scrypt {
        Scrypt::new(ScryptSettings::DEFAULT)
    }
}

impl PasswordBasedKdf for Scrypt {
    fn derive_new_key(&self, key_size: usize, password: &str) -> Result<DerivedKey, KdfError> {
        let salt = OsRandom.bytes(self.settings.salt_len);
        let params = ScryptParams::new(
            salt,
            1u64 << self.settings.log_n,
            self.settings.r,
            self.settings.p,
        );
        let key = Self::derive(key_size, password, &params)?;
        Ok(DerivedKey {
            key,
            serialized_params: params.serialize(),
        })
    }

    fn derive_existing_key(
        &self,
        key_size: usize,
        password: &str,
        serialized_params: &[u8],
    ) -> Result<EncryptionKey, KdfError> {
        let params = ScryptParams::deserialize(serialized_params)?;
        Self::derive(key_size, password, &params)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
