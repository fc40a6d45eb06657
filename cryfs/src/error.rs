//! The error type surfaced to the CLI, with its process exit codes.

use std::fmt;
use std::io;
use std::path::PathBuf;

use cryfs_blockstore::BlockStoreError;
use cryfs_utils::console::ConsoleError;
use cryfs_utils::crypto::kdf::KdfError;
use cryfs_utils::data::SerializationError;

#[derive(Debug)]
pub enum CryfsError {
    /// The base directory is missing or not readable/writable.
    InaccessibleBaseDir(PathBuf, io::Error),
    /// The mount directory is missing or not accessible (checked by the
    /// FUSE adapter; defined here so the exit code mapping is complete).
    InaccessibleMountDir(PathBuf, io::Error),
    /// The config decrypted fine, but local state says this base directory
    /// held a different filesystem before.
    FilesystemIdChanged,
    /// The config's inner encryption key differs from the one this host saw
    /// before - someone replaced the config file.
    EncryptionKeyChanged,
    /// The config file did not authenticate under the derived key.
    WrongPassword,
    /// Filesystem format is newer than this build supports.
    TooNewFilesystemFormat,
    /// Filesystem format is older and the user declined to migrate.
    TooOldFilesystemFormat,
    /// The cipher given on the command line disagrees with the config.
    CipherMismatch {
        config_cipher: String,
        commandline_cipher: String,
    },
    UnknownCipher(String),
    /// The config file exists but is not a valid config record.
    InvalidConfigFile,
    Kdf(KdfError),
    Console(ConsoleError),
    BlockStore(BlockStoreError),
    Serialization(SerializationError),
    Io(io::Error),
}

impl CryfsError {
    /// Process exit code reported to the caller.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InaccessibleBaseDir(_, _) => 10,
            Self::InaccessibleMountDir(_, _) => 11,
            Self::FilesystemIdChanged => 14,
            Self::EncryptionKeyChanged => 15,
            Self::WrongPassword => 16,
            Self::TooNewFilesystemFormat => 17,
            Self::TooOldFilesystemFormat => 18,
            _ => 1,
        }
    }
}

impl fmt::Display for CryfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InaccessibleBaseDir(path, err) => {
                write!(f, "base directory {} is not accessible: {}", path.display(), err)
            }
            Self::InaccessibleMountDir(path, err) => {
                write!(f, "mount directory {} is not accessible: {}", path.display(), err)
            }
            Self::FilesystemIdChanged => write!(
                f,
                "the filesystem id changed since this base directory was last used - this might be a different filesystem placed at the same location"
            ),
            Self::EncryptionKeyChanged => write!(
                f,
                "the encryption key changed since this filesystem was last opened - the config file might have been replaced by an attacker"
            ),
            Self::WrongPassword => write!(f, "could not decrypt the config file - wrong password?"),
            Self::TooNewFilesystemFormat => write!(
                f,
                "this filesystem uses a newer format. Please update your CryFS version."
            ),
            Self::TooOldFilesystemFormat => write!(
                f,
                "this filesystem uses an older format. It has to be migrated."
            ),
            Self::CipherMismatch {
                config_cipher,
                commandline_cipher,
            } => write!(
                f,
                "filesystem uses {} cipher and not {} as specified",
                config_cipher, commandline_cipher
            ),
            Self::UnknownCipher(name) => write!(f, "unknown cipher: {}", name),
            Self::InvalidConfigFile => write!(f, "invalid config file format"),
            Self::Kdf(err) => write!(f, "{}", err),
            Self::Console(err) => write!(f, "{}", err),
            Self::BlockStore(err) => write!(f, "{}", err),
            Self::Serialization(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CryfsError {}

impl From<io::Error> for CryfsError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<KdfError> for CryfsError {
    fn from(err: KdfError) -> Self {
        Self::Kdf(err)
    }
}

impl From<ConsoleError> for CryfsError {
    fn from(err: ConsoleError) -> Self {
        Self::Console(err)
    }
}

impl From<BlockStoreError> for CryfsError {
    fn from(err: BlockStoreError) -> Self {
        Self::BlockStore(err)
    }
}

impl From<SerializationError> for CryfsError {
    fn from(err: SerializationError) -> Self {
        Self::Serialization(err)
    }
}
