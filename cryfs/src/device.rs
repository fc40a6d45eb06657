//! The root façade handed to the FUSE adapter.
//!
//! Opens (or creates) the filesystem in a base directory: loads the config,
//! cross-checks it against this host's local state to detect filesystem
//! substitution, and composes the block store stack
//! `ParallelAccess(Caching(Encrypted<Cipher>(OnDisk)))` keyed with the
//! config's inner encryption key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cryfs_blockstore::{
    new_encrypted_block_store, BlockStore, CachingBlockStore, CipherInstantiationError,
    OnDiskBlockStore, ParallelAccessBlockStore,
};
use cryfs_utils::console::Console;
use cryfs_utils::crypto::symmetric::EncryptionKey;
use cryfs_utils::random::RandomGenerator;

use crate::config::{ConfigLoadResult, CryConfigFile, CryConfigLoader, CryKeyProvider, CONFIG_FILE_NAME};
use crate::error::CryfsError;
use crate::localstate::{BasedirMetadata, LocalStateDir};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub struct DeviceOptions {
    pub base_dir: PathBuf,
    /// Config file location; defaults to `<base_dir>/cryfs.config`.
    pub config_path: Option<PathBuf>,
    pub create_missing_basedir: bool,
    pub allow_filesystem_upgrade: bool,
    /// Skip the filesystem-id cross-check (the user knowingly replaced the
    /// filesystem in this base directory).
    pub allow_replaced_filesystem: bool,
    pub cipher: Option<String>,
    pub blocksize_bytes: Option<u64>,
    pub missing_block_is_integrity_violation: Option<bool>,
}

impl DeviceOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> DeviceOptions {
        DeviceOptions {
            base_dir: base_dir.into(),
            config_path: None,
            create_missing_basedir: false,
            allow_filesystem_upgrade: false,
            allow_replaced_filesystem: false,
            cipher: None,
            blocksize_bytes: None,
            missing_block_is_integrity_violation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CryDevice
// ---------------------------------------------------------------------------

pub struct CryDevice {
    block_store: Box<dyn BlockStore>,
    config: CryConfigFile,
    my_client_id: u32,
}

impl CryDevice {
    /// Open the filesystem in `options.base_dir`, creating it if there is
    /// no config file yet.
    pub fn open(
        console: Arc<dyn Console>,
        rng: Arc<dyn RandomGenerator>,
        key_provider: Arc<dyn CryKeyProvider>,
        local_state_dir: LocalStateDir,
        options: DeviceOptions,
    ) -> Result<CryDevice, CryfsError> {
        check_base_dir(&options.base_dir, options.create_missing_basedir)?;
        let config_path = options
            .config_path
            .clone()
            .unwrap_or_else(|| options.base_dir.join(CONFIG_FILE_NAME));

        let loader = CryConfigLoader::new(
            console,
            rng,
            key_provider,
            local_state_dir.clone(),
            options.cipher.clone(),
            options.blocksize_bytes,
            options.missing_block_is_integrity_violation,
        );
        let ConfigLoadResult {
            config_file,
            my_client_id,
        } = loader.load_or_create(&config_path, options.allow_filesystem_upgrade)?;

        let enc_key = EncryptionKey::from_hex(config_file.config().enc_key())
            .map_err(|_| CryfsError::InvalidConfigFile)?;
        check_against_local_state(
            &local_state_dir,
            &options.base_dir,
            &config_file,
            &enc_key,
            options.allow_replaced_filesystem,
        )?;

        let block_store = build_block_store_stack(
            &options.base_dir,
            config_file.config().cipher(),
            enc_key,
        )?;

        Ok(CryDevice {
            block_store,
            config: config_file,
            my_client_id,
        })
    }

    /// The top-of-stack block store the blob layer runs on.
    pub fn block_store(&self) -> &dyn BlockStore {
        self.block_store.as_ref()
    }

    pub fn config(&self) -> &CryConfigFile {
        &self.config
    }

    pub fn my_client_id(&self) -> u32 {
        self.my_client_id
    }
}

// ---------------------------------------------------------------------------
// Open steps
// ---------------------------------------------------------------------------

fn check_base_dir(base_dir: &Path, create_missing: bool) -> Result<(), CryfsError> {
    if !base_dir.exists() {
        if !create_missing {
            return Err(CryfsError::InaccessibleBaseDir(
                base_dir.to_path_buf(),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        fs::create_dir_all(base_dir).map_err(|err| {
            CryfsError::InaccessibleBaseDir(base_dir.to_path_buf(), err)
        })?;
    }
    // Readability check; a directory we cannot list we cannot serve from.
    fs::read_dir(base_dir)
        .map_err(|err| CryfsError::InaccessibleBaseDir(base_dir.to_path_buf(), err))?;
    Ok(())
}

fn check_against_local_state(
    local_state_dir: &LocalStateDir,
    base_dir: &Path,
    config_file: &CryConfigFile,
    enc_key: &EncryptionKey,
    allow_replaced_filesystem: bool,
) -> Result<(), CryfsError> {
    let mut metadata = BasedirMetadata::load(local_state_dir)?;
    let filesystem_id = config_file.config().filesystem_id();

    if !allow_replaced_filesystem
        && !metadata.filesystem_id_for_basedir_is_correct(base_dir, filesystem_id)
    {
        return Err(CryfsError::FilesystemIdChanged);
    }
    if !metadata.encryption_key_for_basedir_is_correct(base_dir, enc_key) {
        return Err(CryfsError::EncryptionKeyChanged);
    }

    metadata
        .update_for_basedir(base_dir, filesystem_id, enc_key)
        .save()?;
    Ok(())
}

fn build_block_store_stack(
    base_dir: &Path,
    cipher_name: &str,
    enc_key: EncryptionKey,
) -> Result<Box<dyn BlockStore>, CryfsError> {
    let ondisk = Box::new(OnDiskBlockStore::new(base_dir));
    let encrypted =
        new_encrypted_block_store(cipher_name, enc_key, ondisk).map_err(|err| match err {
            CipherInstantiationError::UnknownCipher(name) => CryfsError::UnknownCipher(name),
            // A key whose size doesn't fit the configured cipher means the
            // config record itself is broken.
            CipherInstantiationError::InvalidKeySize(_) => CryfsError::InvalidConfigFile,
        })?;
    let caching = Box::new(CachingBlockStore::new(encrypted));
    Ok(Box::new(ParallelAccessBlockStore::new(caching)))
}
