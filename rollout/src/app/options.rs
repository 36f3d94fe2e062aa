//! Run options shared by every step of a rollout or repair

use uuid::Uuid;

use crate::deploy::fsm::ConvergenceSettings;
use crate::models::generation::Generation;

/// Context of one rollout or repair run.
///
/// Built once by the entry point and passed down explicitly to the
/// orchestrators, the rotation protocol and the convergence loop.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifies the run in logs
    pub run_id: Uuid,

    /// Environment being deployed or repaired
    pub environment: String,

    /// Generation the run targets
    pub generation: Generation,

    /// Whether an operator is attached to answer prompts
    pub interactive: bool,

    /// Bring nodes into operation even if they were not operational before
    pub make_operational: bool,

    /// Convergence loop tuning
    pub convergence: ConvergenceSettings,
}

impl RunContext {
    /// Context for a run against `generation` of `environment`. Runs against
    /// the active generation always leave it fully operational.
    pub fn new(environment: impl Into<String>, generation: Generation) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            environment: environment.into(),
            generation,
            interactive: true,
            make_operational: generation == Generation::Active,
            convergence: ConvergenceSettings::default(),
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_convergence(mut self, convergence: ConvergenceSettings) -> Self {
        self.convergence = convergence;
        self
    }

    /// Whether the run touches the generation serving live traffic
    pub fn is_active(&self) -> bool {
        self.generation == Generation::Active
    }
}
