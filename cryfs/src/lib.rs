//! Encrypted filesystem core.
//!
//! Bootstraps the block storage stack from a password: derives the outer key
//! with scrypt, loads or creates the encrypted `cryfs.config` record,
//! cross-checks it against per-host local state to detect filesystem
//! substitution, and composes the
//! `ParallelAccess(Caching(Encrypted<Cipher>(OnDisk)))` stack the blob layer
//! runs on. The FUSE adapter and CLI live elsewhere and consume
//! [`device::CryDevice`] and the exit codes in [`error`].

pub mod config;
pub mod device;
pub mod error;
pub mod localstate;
pub mod version;

pub use config::{ConfigLoadResult, CryConfig, CryConfigFile, CryConfigLoader};
pub use device::{CryDevice, DeviceOptions};
pub use error::CryfsError;
