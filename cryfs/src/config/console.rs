//! The interactive questions asked when creating a filesystem.

use std::sync::Arc;

use cryfs_utils::console::Console;
use cryfs_utils::crypto::symmetric::ALL_CIPHERS;

use crate::error::CryfsError;

/// Default cipher for new filesystems.
pub const DEFAULT_CIPHER: &str = "aes-256-gcm";
/// Default block size for new filesystems.
pub const DEFAULT_BLOCKSIZE_BYTES: u64 = 32768;

const BLOCKSIZE_CHOICES: &[u64] = &[4096, 8192, 16384, 32768, 65536, 131072];

/// Wraps a [`Console`] with the concrete question flow for filesystem
/// creation. In noninteractive mode every yes/no question answers with its
/// default, which ends up choosing the default settings without prompting.
pub struct CryConfigConsole {
    console: Arc<dyn Console>,
}

impl CryConfigConsole {
    pub fn new(console: Arc<dyn Console>) -> CryConfigConsole {
        CryConfigConsole { console }
    }

    fn use_default_settings(&self) -> bool {
        self.console
            .ask_yes_no("Use default settings?", true)
    }

    pub fn ask_cipher(&self) -> Result<String, CryfsError> {
        if self.use_default_settings() {
            return Ok(DEFAULT_CIPHER.to_string());
        }
        let names: Vec<&str> = ALL_CIPHERS.iter().map(|cipher| cipher.name).collect();
        loop {
            let choice = self
                .console
                .ask("Which block cipher do you want to use?", &names)?;
            let chosen = &ALL_CIPHERS[choice];
            if chosen.authenticated {
                return Ok(chosen.name.to_string());
            }
            // CFB ciphers detect no tampering at all; make the user
            // acknowledge that before accepting the choice.
            let confirmed = self.console.ask_yes_no(
                "This cipher does not protect the integrity of your data: modifications by an attacker will not be detected. Use it anyway?",
                false,
            );
            if confirmed {
                return Ok(chosen.name.to_string());
            }
        }
    }

    pub fn ask_blocksize_bytes(&self) -> Result<u64, CryfsError> {
        if self.use_default_settings() {
            return Ok(DEFAULT_BLOCKSIZE_BYTES);
        }
        let labels: Vec<String> = BLOCKSIZE_CHOICES
            .iter()
            .map(|size| format!("{} KB", size / 1024))
            .collect();
        let labels_ref: Vec<&str> = labels.iter().map(String::as_str).collect();
        let choice = self
            .console
            .ask("Which block size do you want to use?", &labels_ref)?;
        Ok(BLOCKSIZE_CHOICES[choice])
    }

    pub fn ask_missing_block_is_integrity_violation(&self) -> Result<bool, CryfsError> {
        Ok(self.console.ask_yes_no(
            "Most integrity checks are enabled by default. However, by default CryFS does not treat missing blocks as integrity violations.\nYou should enable this only if this filesystem is used from a single client only.\nTreat missing blocks as integrity violations?",
            false,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryfs_utils::console::{ConsoleError, NoninteractiveConsole};

    struct PanickingConsole;

    impl Console for PanickingConsole {
        fn print(&self, _message: &str) {}

        fn ask_yes_no(&self, _question: &str, _default: bool) -> bool {
            panic!("unexpected yes/no prompt");
        }

        fn ask(&self, _question: &str, _options: &[&str]) -> Result<usize, ConsoleError> {
            panic!("unexpected choice prompt");
        }

        fn ask_password(&self, _prompt: &str) -> Result<String, ConsoleError> {
            panic!("unexpected password prompt");
        }
    }

    /// Scripted console: declines defaults, then picks a fixed choice.
    struct ChoosingConsole {
        choice: usize,
        confirm_unauthenticated: bool,
    }

    impl Console for ChoosingConsole {
        fn print(&self, _message: &str) {}

        fn ask_yes_no(&self, question: &str, _default: bool) -> bool {
            if question.contains("default settings") {
                false
            } else {
                self.confirm_unauthenticated
            }
        }

        fn ask(&self, _question: &str, _options: &[&str]) -> Result<usize, ConsoleError> {
            Ok(self.choice)
        }

        fn ask_password(&self, _prompt: &str) -> Result<String, ConsoleError> {
            Err(ConsoleError::NotInteractive)
        }
    }

    #[test]
    fn noninteractive_mode_chooses_defaults_without_prompting() {
        let console = CryConfigConsole::new(Arc::new(NoninteractiveConsole::new(Arc::new(
            PanickingConsole,
        ))));
        assert_eq!(DEFAULT_CIPHER, console.ask_cipher().unwrap());
        assert_eq!(
            DEFAULT_BLOCKSIZE_BYTES,
            console.ask_blocksize_bytes().unwrap()
        );
        assert!(!console.ask_missing_block_is_integrity_violation().unwrap());
    }

    #[test]
    fn choosing_an_authenticated_cipher_needs_no_confirmation() {
        let index = ALL_CIPHERS
            .iter()
            .position(|cipher| cipher.name == "twofish-256-gcm")
            .unwrap();
        let console = CryConfigConsole::new(Arc::new(ChoosingConsole {
            choice: index,
            confirm_unauthenticated: false,
        }));
        assert_eq!("twofish-256-gcm", console.ask_cipher().unwrap());
    }

    #[test]
    fn choosing_an_unauthenticated_cipher_requires_confirmation() {
        let index = ALL_CIPHERS
            .iter()
            .position(|cipher| cipher.name == "aes-256-cfb")
            .unwrap();
        let console = CryConfigConsole::new(Arc::new(ChoosingConsole {
            choice: index,
            confirm_unauthenticated: true,
        }));
        assert_eq!("aes-256-cfb", console.ask_cipher().unwrap());
    }

    #[test]
    fn custom_blocksize_choice_is_used() {
        let console = CryConfigConsole::new(Arc::new(ChoosingConsole {
            choice: 0,
            confirm_unauthenticated: false,
        }));
        assert_eq!(4096, console.ask_blocksize_bytes().unwrap());
    }
}
