//! Prompt abstraction for interactive commands
//!
//! Commands that may ask the user something take a `&dyn Prompter` so the
//! terminal implementation can be swapped out when no one is attached.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Something that can answer a question with one of a fixed set of choices
pub trait Prompter {
    /// Ask `message` and return the chosen answer.
    ///
    /// An empty `choices` slice means free-form input.
    fn ask(&self, message: &str, choices: &[&str], default: &str) -> crate::Result<String>;
}

/// Always answers with the default
#[derive(Debug, Clone, Default)]
pub struct DefaultPrompter;

impl Prompter for DefaultPrompter {
    fn ask(&self, message: &str, _choices: &[&str], default: &str) -> crate::Result<String> {
        tracing::debug!(action = "prompt", message, default, "answering with default");
        Ok(default.to_string())
    }
}

/// Answers from a queue, then falls back to the default
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create a prompter that returns `answers` in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Create a prompter that answers every question with `answer`
    pub fn always(answer: impl Into<String>) -> AlwaysPrompter {
        AlwaysPrompter(answer.into())
    }

    /// Messages asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, message: &str, _choices: &[&str], default: &str) -> crate::Result<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        let next = self.answers.lock().ok().and_then(|mut a| a.pop_front());
        Ok(next.unwrap_or_else(|| default.to_string()))
    }
}

/// Answers every question the same way
#[derive(Debug, Clone)]
pub struct AlwaysPrompter(pub String);

impl Prompter for AlwaysPrompter {
    fn ask(&self, _message: &str, _choices: &[&str], _default: &str) -> crate::Result<String> {
        Ok(self.0.clone())
    }
}
