//! Error types for rollout and repair runs

use thiserror::Error;

/// Main error type for rollout and repair runs
#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A deployment, node or deployer call failed
    #[error("Collaborator error: {0}")]
    CollaboratorError(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Convergence state machine error: {0}")]
    FsmError(String),

    /// The node could not be pulled from service without an interruption and
    /// nobody agreed to continue anyway
    #[error("Node {node} doesn't have required redundancy")]
    UnsafeRotation { node: String },

    /// The operator chose Fail while a node or generation was not operational
    #[error("{target} not operational, aborted by operator")]
    ConvergenceAborted { target: String },

    /// A confirmation prompt was answered negatively
    #[error("Confirmation refused: {0}")]
    ConfirmationRefused(String),

    /// A prompt would have been needed but the run is non-interactive
    #[error("Run is non-interactive, refusing to continue: {0}")]
    NonInteractive(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RolloutError {
    /// Whether this error is a deliberate abort of the whole run rather than
    /// an unexpected failure
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            RolloutError::UnsafeRotation { .. }
                | RolloutError::ConvergenceAborted { .. }
                | RolloutError::ConfirmationRefused(_)
                | RolloutError::NonInteractive(_)
        )
    }
}

impl From<anyhow::Error> for RolloutError {
    fn from(err: anyhow::Error) -> Self {
        RolloutError::Internal(err.to_string())
    }
}

impl From<dialoguer::Error> for RolloutError {
    fn from(err: dialoguer::Error) -> Self {
        RolloutError::PromptError(err.to_string())
    }
}
