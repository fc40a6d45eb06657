//! Sources of the outer (config-file) encryption key.

use cryfs_utils::crypto::kdf::{KdfError, PasswordBasedKdf};
use cryfs_utils::crypto::symmetric::EncryptionKey;
use cryfs_utils::data::Data;

/// A freshly derived outer key plus the serialized KDF parameters that must
/// be stored next to the ciphertext.
pub struct KeyAndParams {
    pub key: EncryptionKey,
    pub serialized_params: Data,
}

/// Provides the key that encrypts the config file.
pub trait CryKeyProvider: Send + Sync {
    /// Fresh key (and parameters) for a filesystem being created.
    fn request_key_for_new_filesystem(&self, key_size: usize) -> Result<KeyAndParams, KdfError>;

    /// Re-derive the key for an existing filesystem from its stored
    /// parameters.
    fn request_key_for_existing_filesystem(
        &self,
        key_size: usize,
        serialized_params: &[u8],
    ) -> Result<EncryptionKey, KdfError>;
}

/// Key provider with a fixed password, e.g. from the CLI prompt or a
/// password file.
pub struct PresetPasswordKeyProvider {
    password: String,
    kdf: Box<dyn PasswordBasedKdf>,
}

impl PresetPasswordKeyProvider {
    pub fn new(password: impl Into<String>, kdf: Box<dyn PasswordBasedKdf>) -> PresetPasswordKeyProvider {
        PresetPasswordKeyProvider {
            password: password.into(),
            kdf,
        }
    }
}

impl CryKeyProvider for PresetPasswordKeyProvider {
    fn request_key_for_new_filesystem(&self, key_size: usize) -> Result<KeyAndParams, KdfError> {
        let derived = self.kdf.derive_new_key(key_size, &self.password)?;
        Ok(KeyAndParams {
            key: derived.key,
            serialized_params: derived.serialized_params,
        })
    }

    fn request_key_for_existing_filesystem(
        &self,
        key_size: usize,
        serialized_params: &[u8],
    ) -> Result<EncryptionKey, KdfError> {
        self.kdf
            .derive_existing_key(key_size, &self.password, serialized_params)
    }
}
