//! User interaction abstraction.
//!
//! The config loader talks to the user through this trait so tests can
//! substitute a scripted console and daemons can run without one.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConsoleError {
    /// A prompt was issued in noninteractive mode that has no default.
    NotInteractive,
    Io(io::Error),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInteractive => write!(f, "prompt issued in noninteractive mode"),
            Self::Io(err) => write!(f, "console i/o error: {}", err),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl From<io::Error> for ConsoleError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Console trait
// ---------------------------------------------------------------------------

pub trait Console: Send + Sync {
    fn print(&self, message: &str);

    /// Yes/no question with a default answer.
    fn ask_yes_no(&self, question: &str, default: bool) -> bool;

    /// Choice among `options`; returns the chosen index.
    fn ask(&self, question: &str, options: &[&str]) -> Result<usize, ConsoleError>;

    fn ask_password(&self, prompt: &str) -> Result<String, ConsoleError>;
}

// ---------------------------------------------------------------------------
// Interactive console on stdin/stdout
// ---------------------------------------------------------------------------

pub struct IoConsole;

impl IoConsole {
    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Console for IoConsole {
    fn print(&self, message: &str) {
        print!("{}", message);
        let _ = io::stdout().flush();
    }

    fn ask_yes_no(&self, question: &str, default: bool) -> bool {
        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            self.print(&format!("{} {} ", question, suffix));
            let answer = match self.read_line() {
                Ok(answer) => answer,
                Err(_) => return default,
            };
            match answer.to_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => self.print("Please answer yes or no.\n"),
            }
        }
    }

    fn ask(&self, question: &str, options: &[&str]) -> Result<usize, ConsoleError> {
        self.print(&format!("{}\n", question));
        for (index, option) in options.iter().enumerate() {
            self.print(&format!("  [{}] {}\n", index + 1, option));
        }
        loop {
            self.print("> ");
            let answer = self.read_line()?;
            match answer.parse::<usize>() {
                Ok(choice) if choice >= 1 && choice <= options.len() => return Ok(choice - 1),
                _ => self.print("Please enter a valid option number.\n"),
            }
        }
    }

    fn ask_password(&self, prompt: &str) -> Result<String, ConsoleError> {
        self.print(prompt);
        Ok(self.read_line()?)
    }
}

// ---------------------------------------------------------------------------
// Noninteractive wrapper
// ---------------------------------------------------------------------------

/// Answers every yes/no question with its default and refuses prompts that
/// have no default. Used when running without a terminal.
pub struct NoninteractiveConsole {
    inner: Arc<dyn Console>,
}

impl NoninteractiveConsole {
    pub fn new(inner: Arc<dyn Console>) -> NoninteractiveConsole {
        NoninteractiveConsole { inner }
    }
}

impl Console for NoninteractiveConsole {
    fn print(&self, message: &str) {
        self.inner.print(message);
    }

    fn ask_yes_no(&self, _question: &str, default: bool) -> bool {
        default
    }

    fn ask(&self, _question: &str, _options: &[&str]) -> Result<usize, ConsoleError> {
        Err(ConsoleError::NotInteractive)
    }

    fn ask_password(&self, _prompt: &str) -> Result<String, ConsoleError> {
        Err(ConsoleError::NotInteractive)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
