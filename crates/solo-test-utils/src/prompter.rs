//! Scripted prompt answers

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use solo_core::{LocalConfigError, Prompter};

/// [`Prompter`] replaying fixed answers in order
///
/// Running out of answers fails the prompt, which makes unexpected
/// questions visible in tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create prompter with answers
    #[must_use]
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| (*a).to_string()).collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }

    /// Answers not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&self, question: &str, _default: Option<&str>) -> Result<String, LocalConfigError> {
        self.questions.lock().push(question.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| LocalConfigError::Prompt(format!("no scripted answer for '{question}'")))
    }
}
