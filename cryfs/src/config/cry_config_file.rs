//! The encrypted on-disk envelope around [`CryConfig`].
//!
//! File layout:
//!
//! ```text
//! [ u32 format_tag | u64 kdf_params_len | kdf_params | ciphertext ]
//! ```
//!
//! The KDF parameter block is in the clear (it is needed to re-derive the
//! key); the ciphertext is the serialized config under a fixed outer
//! AES-256-GCM keyed with the scrypt-derived key. The GCM tag covers the
//! whole serialized config, so a wrong password surfaces as an
//! authentication failure.

use std::path::{Path, PathBuf};

use cryfs_utils::crypto::symmetric::{Aes256Gcm, Cipher};
use cryfs_utils::data::{Data, Deserializer, Serializer};

use crate::error::CryfsError;

use super::cry_config::CryConfig;
use super::key_provider::CryKeyProvider;

/// Format tag at the start of the file; bumped on envelope layout changes.
const FORMAT_TAG: u32 = 1;

/// Key size of the fixed outer cipher.
const OUTER_KEY_SIZE: usize = Aes256Gcm::KEY_SIZE;

pub struct CryConfigFile {
    path: PathBuf,
    config: CryConfig,
    outer_cipher: Aes256Gcm,
    serialized_kdf_params: Data,
}

impl CryConfigFile {
    /// Derive a fresh outer key, encrypt `config` and write it to `path`.
    pub fn create(
        path: impl Into<PathBuf>,
        config: CryConfig,
        key_provider: &dyn CryKeyProvider,
    ) -> Result<CryConfigFile, CryfsError> {
        let key_and_params = key_provider.request_key_for_new_filesystem(OUTER_KEY_SIZE)?;
        let outer_cipher = Aes256Gcm::new(key_and_params.key)
            .expect("kdf returned a key of the wrong size");
        let config_file = CryConfigFile {
            path: path.into(),
            config,
            outer_cipher,
            serialized_kdf_params: key_and_params.serialized_params,
        };
        config_file.save()?;
        Ok(config_file)
    }

    /// Read and decrypt the config at `path`.
    ///
    /// Fails with [`CryfsError::WrongPassword`] if the ciphertext does not
    /// authenticate under the derived key, and with
    /// [`CryfsError::InvalidConfigFile`] if the envelope or the inner
    /// record cannot be parsed.
    pub fn load(
        path: impl Into<PathBuf>,
        key_provider: &dyn CryKeyProvider,
    ) -> Result<CryConfigFile, CryfsError> {
        let path = path.into();
        let file_content = Data::load_from_file(&path)?
            .ok_or_else(|| CryfsError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))?;

        let mut deserializer = Deserializer::new(file_content.as_slice());
        let parsed = (|| {
            let format_tag = deserializer.read_u32()?;
            if format_tag != FORMAT_TAG {
                return Err(cryfs_utils::data::SerializationError::InvalidValue);
            }
            let kdf_params = deserializer.read_data()?;
            let ciphertext = deserializer.read_tail_data()?;
            Ok((kdf_params, ciphertext))
        })();
        let (kdf_params, ciphertext) = parsed.map_err(|_| CryfsError::InvalidConfigFile)?;

        let key =
            key_provider.request_key_for_existing_filesystem(OUTER_KEY_SIZE, kdf_params.as_slice())?;
        let outer_cipher = Aes256Gcm::new(key).expect("kdf returned a key of the wrong size");

        let plaintext = outer_cipher
            .decrypt(ciphertext.as_slice())
            .ok_or(CryfsError::WrongPassword)?;
        let config = CryConfig::deserialize(plaintext.as_slice())
            .map_err(|_| CryfsError::InvalidConfigFile)?;

        Ok(CryConfigFile {
            path,
            config,
            outer_cipher,
            serialized_kdf_params: kdf_params,
        })
    }

    /// Re-encrypt (with a fresh IV) and atomically rewrite the file.
    pub fn save(&self) -> Result<(), CryfsError> {
        let serialized_config = self.config.serialize();
        let ciphertext = self
            .outer_cipher
            .encrypt(serialized_config.as_slice())
            .map_err(|_| CryfsError::InvalidConfigFile)?;

        let size = 4 + Serializer::data_size(&self.serialized_kdf_params) + ciphertext.len();
        let mut serializer = Serializer::new(size);
        serializer.write_u32(FORMAT_TAG).unwrap();
        serializer.write_data(&self.serialized_kdf_params).unwrap();
        serializer.write_tail_data(&ciphertext).unwrap();
        let file_content = serializer.finished().unwrap();

        file_content.store_to_file(&self.path)?;
        Ok(())
    }

    pub fn config(&self) -> &CryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CryConfig {
        &mut self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
