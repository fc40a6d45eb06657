//! The filesystem configuration subsystem: the config record, its encrypted
//! on-disk envelope, and the create-vs-load orchestration.

mod console;
mod creator;
mod cry_config;
mod cry_config_file;
mod key_provider;
mod loader;

pub use console::CryConfigConsole;
pub use cry_config::{CryConfig, FilesystemId};
pub use cry_config_file::CryConfigFile;
pub use key_provider::{CryKeyProvider, KeyAndParams, PresetPasswordKeyProvider};
pub use loader::{ConfigLoadResult, CryConfigLoader};

/// Name of the config file inside the base directory.
pub const CONFIG_FILE_NAME: &str = "cryfs.config";
