//! Builds the [`CryConfig`] for a filesystem being created.

use std::sync::Arc;

use cryfs_utils::console::Console;
use cryfs_utils::crypto::symmetric::{lookup_cipher, EncryptionKey};
use cryfs_utils::random::RandomGenerator;

use crate::error::CryfsError;
use crate::version::{crate_version, FILESYSTEM_FORMAT_VERSION};

use super::console::CryConfigConsole;
use super::cry_config::{CryConfig, FilesystemId};

pub(crate) struct CryConfigCreator<'a> {
    console: CryConfigConsole,
    rng: &'a dyn RandomGenerator,
}

impl<'a> CryConfigCreator<'a> {
    pub fn new(console: Arc<dyn Console>, rng: &'a dyn RandomGenerator) -> CryConfigCreator<'a> {
        CryConfigCreator {
            console: CryConfigConsole::new(console),
            rng,
        }
    }

    /// Choose the settings (from the command line where given, else by
    /// asking) and generate the random parts: the inner encryption key and
    /// the filesystem id. The root blob stays empty; it is created on first
    /// mount.
    pub fn create(
        &self,
        cipher_from_commandline: Option<&str>,
        blocksize_from_commandline: Option<u64>,
        missing_block_is_integrity_violation_from_commandline: Option<bool>,
    ) -> Result<CryConfig, CryfsError> {
        let cipher = match cipher_from_commandline {
            Some(cipher) => cipher.to_string(),
            None => self.console.ask_cipher()?,
        };
        let cipher_description = lookup_cipher(&cipher)
            .ok_or_else(|| CryfsError::UnknownCipher(cipher.clone()))?;

        let blocksize_bytes = match blocksize_from_commandline {
            Some(blocksize) => blocksize,
            None => self.console.ask_blocksize_bytes()?,
        };
        let missing_block_is_integrity_violation =
            match missing_block_is_integrity_violation_from_commandline {
                Some(choice) => choice,
                None => self.console.ask_missing_block_is_integrity_violation()?,
            };

        let enc_key = EncryptionKey::generate(self.rng, cipher_description.key_size);
        let filesystem_id = FilesystemId::random(self.rng);

        Ok(CryConfig::new(
            String::new(),
            enc_key.to_hex(),
            cipher,
            FILESYSTEM_FORMAT_VERSION.to_string(),
            crate_version().to_string(),
            crate_version().to_string(),
            blocksize_bytes,
            filesystem_id,
            None,
            missing_block_is_integrity_violation,
        ))
    }
}
