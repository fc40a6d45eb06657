//! Shared helpers for the config and device test suites.
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::{Arc, Mutex};

use cryfs::config::PresetPasswordKeyProvider;
use cryfs::localstate::LocalStateDir;
use cryfs_utils::console::{Console, ConsoleError};
use cryfs_utils::crypto::kdf::{Scrypt, ScryptSettings};

/// Console with scripted yes/no answers, recording every question asked.
/// Questions without a scripted rule answer with their default.
pub struct ScriptedConsole {
    rules: Mutex<Vec<(String, bool)>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new() -> Arc<ScriptedConsole> {
        Arc::new(ScriptedConsole {
            rules: Mutex::new(Vec::new()),
            asked: Mutex::new(Vec::new()),
        })
    }

    /// Answer any yes/no question containing `substring` with `answer`.
    pub fn answer_yes_no(&self, substring: &str, answer: bool) {
        self.rules
            .lock()
            .unwrap()
            .push((substring.to_string(), answer));
    }

    pub fn was_asked(&self, substring: &str) -> bool {
        self.asked
            .lock()
            .unwrap()
            .iter()
            .any(|question| question.contains(substring))
    }
}

impl Console for ScriptedConsole {
    fn print(&self, _message: &str) {}

    fn ask_yes_no(&self, question: &str, default: bool) -> bool {
        self.asked.lock().unwrap().push(question.to_string());
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .find(|(substring, _)| question.contains(substring))
            .map(|(_, answer)| *answer)
            .unwrap_or(default)
    }

    fn ask(&self, question: &str, _options: &[&str]) -> Result<usize, ConsoleError> {
        panic!("unexpected choice prompt: {}", question);
    }

    fn ask_password(&self, _prompt: &str) -> Result<String, ConsoleError> {
        panic!("unexpected password prompt");
    }
}

pub fn key_provider(password: &str) -> Arc<PresetPasswordKeyProvider> {
    Arc::new(PresetPasswordKeyProvider::new(
        password,
        Box::new(Scrypt::new(ScryptSettings::TEST)),
    ))
}

pub fn local_state_dir(tempdir: &tempfile::TempDir) -> LocalStateDir {
    LocalStateDir::new(tempdir.path().join("local-state"))
}
