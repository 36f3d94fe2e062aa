//! Operator prompts
//!
//! Every question the rollout asks goes through a [`Prompter`], so the
//! decision source can be a terminal or a scripted list of answers.

use std::collections::VecDeque;
use std::sync::Mutex;

use dialoguer::Input;

use crate::errors::RolloutError;

/// Source of operator decisions
pub trait Prompter: Send + Sync {
    /// Ask `message` and return the raw answer
    fn ask(&self, message: &str) -> Result<String, RolloutError>;

    /// Ask `message` until the answer is exactly one of `options`
    fn choose(&self, message: &str, options: &[&str]) -> Result<String, RolloutError> {
        loop {
            let answer = self.ask(message)?;
            if options.contains(&answer.as_str()) {
                return Ok(answer);
            }
        }
    }
}

/// Operator answer when a node or generation did not become operational
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChoice {
    /// Accept the degraded state and move on
    Ignore,

    /// Try again
    Retry,

    /// Abort the whole run
    Fail,
}

impl OperatorChoice {
    pub const OPTIONS: [&'static str; 3] = ["I", "R", "F"];

    fn from_answer(answer: &str) -> Option<Self> {
        match answer {
            "I" => Some(OperatorChoice::Ignore),
            "R" => Some(OperatorChoice::Retry),
            "F" => Some(OperatorChoice::Fail),
            _ => None,
        }
    }
}

/// Ask a yes/no style question. Only the exact `affirmative` answer counts as
/// a yes.
pub fn confirm(
    prompter: &dyn Prompter,
    message: &str,
    affirmative: &str,
) -> Result<bool, RolloutError> {
    Ok(prompter.ask(message)? == affirmative)
}

/// Ask the Ignore/Retry/Fail question
pub fn ask_operator_choice(
    prompter: &dyn Prompter,
    message: &str,
) -> Result<OperatorChoice, RolloutError> {
    let answer = prompter.choose(message, &OperatorChoice::OPTIONS)?;
    OperatorChoice::from_answer(&answer)
        .ok_or_else(|| RolloutError::PromptError(format!("Unexpected answer: {}", answer)))
}

/// Prompts on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, message: &str) -> Result<String, RolloutError> {
        let answer: String = Input::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer.trim().to_string())
    }
}

/// Answers prompts from a fixed script and records what was asked
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
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

    /// Every prompt shown so far, including repeats after invalid answers
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of scripted answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, message: &str) -> Result<String, RolloutError> {
        self.asked
            .lock()
            .map_err(|e| RolloutError::Internal(e.to_string()))?
            .push(message.to_string());

        self.answers
            .lock()
            .map_err(|e| RolloutError::Internal(e.to_string()))?
            .pop_front()
            .ok_or_else(|| {
                RolloutError::PromptError(format!("No scripted answer for: {}", message))
            })
    }
}
