//! Finite State Machine for operational convergence
//!
//! A convergence run starts in `Attempting`. Failed checks are retried
//! automatically until the retry budget is spent, after which the operator
//! decides. The retry budget is never refilled: an operator `Retry` buys
//! exactly one more attempt before the operator is asked again.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deploy::prompt::OperatorChoice;

/// Convergence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceSettings {
    /// Automatic retries after the first failed attempt on a single node
    #[serde(default = "default_auto_retries")]
    pub auto_retries: u32,

    /// Time given to the load balancer to pick up a node before re-checking
    #[serde(default = "default_settle_delay", with = "millis")]
    #[serde(rename = "settle_delay_ms")]
    pub settle_delay: Duration,
}

fn default_auto_retries() -> u32 {
    10
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            auto_retries: default_auto_retries(),
            settle_delay: default_settle_delay(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Convergence state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceState {
    /// Trying to make the target operational
    Attempting,

    /// Automatic retries exhausted, waiting for the operator
    AwaitingHuman,

    /// Operational, or degraded with the operator's consent
    Converged,

    /// The operator chose to fail the run
    Aborted,
}

/// Convergence event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceEvent {
    /// The target reported operational
    Operational,

    /// The target is still not operational after an attempt
    NotOperational,

    /// The operator answered the escalation prompt
    Operator(OperatorChoice),
}

/// Convergence FSM
#[derive(Debug, Clone)]
pub struct ConvergenceFsm {
    state: ConvergenceState,
    retry_budget: u32,
    retries_used: u32,
    attempts: u32,
    degraded: bool,
}

impl ConvergenceFsm {
    /// Create a new FSM allowing `retry_budget` automatic retries
    pub fn new(retry_budget: u32) -> Self {
        Self {
            state: ConvergenceState::Attempting,
            retry_budget,
            retries_used: 0,
            attempts: 0,
            degraded: false,
        }
    }

    /// Get current state
    pub fn state(&self) -> ConvergenceState {
        self.state
    }

    /// Number of completed attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of automatic retries spent
    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    /// Converged without the target being operational
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ConvergenceState::Converged | ConvergenceState::Aborted
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ConvergenceEvent) -> Result<ConvergenceState, String> {
        let new_state = match (self.state, event) {
            // From Attempting
            (ConvergenceState::Attempting, ConvergenceEvent::Operational) => {
                self.attempts += 1;
                ConvergenceState::Converged
            }
            (ConvergenceState::Attempting, ConvergenceEvent::NotOperational) => {
                self.attempts += 1;
                if self.retries_used < self.retry_budget {
                    self.retries_used += 1;
                    ConvergenceState::Attempting
                } else {
                    ConvergenceState::AwaitingHuman
                }
            }

            // From AwaitingHuman
            (ConvergenceState::AwaitingHuman, ConvergenceEvent::Operator(OperatorChoice::Retry)) => {
                ConvergenceState::Attempting
            }
            (ConvergenceState::AwaitingHuman, ConvergenceEvent::Operator(OperatorChoice::Ignore)) => {
                self.degraded = true;
                ConvergenceState::Converged
            }
            (ConvergenceState::AwaitingHuman, ConvergenceEvent::Operator(OperatorChoice::Fail)) => {
                ConvergenceState::Aborted
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}
