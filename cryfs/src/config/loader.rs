//! Create-vs-load orchestration for the config file.

use std::path::Path;
use std::sync::Arc;

use cryfs_utils::console::Console;
use cryfs_utils::random::RandomGenerator;
use tracing::info;

use crate::error::CryfsError;
use crate::localstate::{LocalStateDir, MyClientId};
use crate::version::{crate_version, is_older_than, FILESYSTEM_FORMAT_VERSION};

use super::creator::CryConfigCreator;
use super::cry_config::CryConfig;
use super::cry_config_file::CryConfigFile;
use super::key_provider::CryKeyProvider;

/// Result of a successful load or create.
pub struct ConfigLoadResult {
    pub config_file: CryConfigFile,
    /// This host's client id for the loaded filesystem.
    pub my_client_id: u32,
}

/// Loads an existing config file or creates a new one, enforcing version
/// gating and cipher consistency on load. Filesystem-substitution checks
/// against the base directory happen one level up, where the base directory
/// is known (see [`crate::device::CryDevice::open`]).
pub struct CryConfigLoader {
    console: Arc<dyn Console>,
    rng: Arc<dyn RandomGenerator>,
    key_provider: Arc<dyn CryKeyProvider>,
    local_state_dir: LocalStateDir,
    cipher_from_commandline: Option<String>,
    blocksize_from_commandline: Option<u64>,
    missing_block_is_integrity_violation_from_commandline: Option<bool>,
}

impl CryConfigLoader {
    pub fn new(
        console: Arc<dyn Console>,
        rng: Arc<dyn RandomGenerator>,
        key_provider: Arc<dyn CryKeyProvider>,
        local_state_dir: LocalStateDir,
        cipher_from_commandline: Option<String>,
        blocksize_from_commandline: Option<u64>,
        missing_block_is_integrity_violation_from_commandline: Option<bool>,
    ) -> CryConfigLoader {
        CryConfigLoader {
            console,
            rng,
            key_provider,
            local_state_dir,
            cipher_from_commandline,
            blocksize_from_commandline,
            missing_block_is_integrity_violation_from_commandline,
        }
    }

    /// Load the config at `config_path`, or create it if no file exists.
    pub fn load_or_create(
        &self,
        config_path: &Path,
        allow_filesystem_upgrade: bool,
    ) -> Result<ConfigLoadResult, CryfsError> {
        if config_path.exists() {
            self.load(config_path, allow_filesystem_upgrade)
        } else {
            self.create(config_path)
        }
    }

    fn load(
        &self,
        config_path: &Path,
        allow_filesystem_upgrade: bool,
    ) -> Result<ConfigLoadResult, CryfsError> {
        let mut config_file = CryConfigFile::load(config_path, &*self.key_provider)?;
        self.check_version(config_file.config(), allow_filesystem_upgrade)?;
        self.check_cipher(config_file.config())?;

        // Record which build opened the filesystem (and, after a migration,
        // the new format version), persistently.
        config_file
            .config_mut()
            .set_version(FILESYSTEM_FORMAT_VERSION);
        config_file
            .config_mut()
            .set_last_opened_with_version(crate_version());
        config_file.save()?;

        let my_client_id = self.my_client_id(config_file.config())?;
        Ok(ConfigLoadResult {
            config_file,
            my_client_id,
        })
    }

    fn create(&self, config_path: &Path) -> Result<ConfigLoadResult, CryfsError> {
        let config = CryConfigCreator::new(self.console.clone(), &*self.rng).create(
            self.cipher_from_commandline.as_deref(),
            self.blocksize_from_commandline,
            self.missing_block_is_integrity_violation_from_commandline,
        )?;
        let config_file = CryConfigFile::create(config_path, config, &*self.key_provider)?;
        info!(path = %config_path.display(), "created new filesystem config");

        let my_client_id = self.my_client_id(config_file.config())?;
        Ok(ConfigLoadResult {
            config_file,
            my_client_id,
        })
    }

    fn check_version(
        &self,
        config: &CryConfig,
        allow_filesystem_upgrade: bool,
    ) -> Result<(), CryfsError> {
        if is_older_than(FILESYSTEM_FORMAT_VERSION, config.version()) {
            // Filesystem was created by a newer build.
            let open_anyway = self.console.ask_yes_no(
                "This filesystem is for a newer version and should not be opened with older versions. It is strongly recommended to update before opening it. Open anyway?",
                false,
            );
            if !open_anyway {
                return Err(CryfsError::TooNewFilesystemFormat);
            }
        }
        if is_older_than(config.version(), FILESYSTEM_FORMAT_VERSION) && !allow_filesystem_upgrade {
            let migrate = self.console.ask_yes_no(
                "This filesystem is for an older version. It has to be migrated before it can be opened; migrated filesystems cannot be opened by older versions anymore. Do you want to migrate it?",
                false,
            );
            if !migrate {
                return Err(CryfsError::TooOldFilesystemFormat);
            }
        }
        Ok(())
    }

    fn check_cipher(&self, config: &CryConfig) -> Result<(), CryfsError> {
        if let Some(cipher) = &self.cipher_from_commandline {
            if cipher != config.cipher() {
                return Err(CryfsError::CipherMismatch {
                    config_cipher: config.cipher().to_string(),
                    commandline_cipher: cipher.clone(),
                });
            }
        }
        Ok(())
    }

    fn my_client_id(&self, config: &CryConfig) -> Result<u32, CryfsError> {
        let state_dir = self.local_state_dir.for_filesystem_id(config.filesystem_id())?;
        Ok(MyClientId::load_or_generate(&state_dir, &*self.rng)?)
    }
}
