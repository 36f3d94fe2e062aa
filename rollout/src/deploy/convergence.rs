//! Operational convergence loop
//!
//! Drives either a single node or the whole active generation to operational.
//! Single nodes get a bounded number of automatic retries before the operator
//! is asked; the generation-wide repair asks after every failed attempt.

use tracing::{error, info, warn};

use crate::app::options::RunContext;
use crate::deploy::fsm::{ConvergenceEvent, ConvergenceFsm, ConvergenceState};
use crate::deploy::prompt::{ask_operator_choice, OperatorChoice, Prompter};
use crate::errors::RolloutError;
use crate::fleet::{Deployment, Node};

/// How a convergence run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceOutcome {
    /// The target is operational
    Operational,

    /// The operator accepted the target in a non-operational state
    Ignored,
}

/// Result of converging the active generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConvergence {
    pub outcome: ConvergenceOutcome,

    /// Nodes the repair activated, in activation order, without repeats
    pub activated: Vec<String>,
}

/// Convergence loop bound to one run
pub struct Converger<'a> {
    ctx: &'a RunContext,
    prompter: &'a dyn Prompter,
}

impl<'a> Converger<'a> {
    pub fn new(ctx: &'a RunContext, prompter: &'a dyn Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Make one node operational
    pub async fn converge_node(&self, node: &dyn Node) -> Result<ConvergenceOutcome, RolloutError> {
        let mut fsm = ConvergenceFsm::new(self.ctx.convergence.auto_retries);

        loop {
            match fsm.state() {
                ConvergenceState::Attempting => {
                    let event = if self.attempt_node(node).await {
                        ConvergenceEvent::Operational
                    } else {
                        ConvergenceEvent::NotOperational
                    };
                    let state = fsm.process(event).map_err(RolloutError::FsmError)?;
                    if state == ConvergenceState::Attempting {
                        info!("Still not operational. Trying again.");
                    }
                }
                ConvergenceState::AwaitingHuman => {
                    info!("Node {} not operational.", node.name());
                    info!(
                        "Health check URL: {}",
                        node.get_health_check_url()
                            .unwrap_or_else(|| "unknown".to_string())
                    );
                    let choice = self.escalate(
                        &format!(
                            "Node {} not made operational. Ignore/Retry/Fail (I/R/F)?",
                            node.name()
                        ),
                        &format!("Node {}", node.name()),
                    )?;
                    fsm.process(ConvergenceEvent::Operator(choice))
                        .map_err(RolloutError::FsmError)?;
                }
                ConvergenceState::Converged => {
                    return Ok(if fsm.is_degraded() {
                        warn!("Leaving node {} non-operational", node.name());
                        ConvergenceOutcome::Ignored
                    } else {
                        ConvergenceOutcome::Operational
                    });
                }
                ConvergenceState::Aborted => {
                    error!("Node {} not healthy. Aborting deployment", node.name());
                    return Err(RolloutError::ConvergenceAborted {
                        target: format!("Node {}", node.name()),
                    });
                }
            }
        }
    }

    /// Make the whole active generation operational through the deployment's
    /// repair primitive
    pub async fn converge_generation(
        &self,
        deployment: &dyn Deployment,
        force_operational: bool,
    ) -> Result<GenerationConvergence, RolloutError> {
        let mut fsm = ConvergenceFsm::new(0);
        let mut activated: Vec<String> = Vec::new();
        let target = format!("Active generation of {}", deployment.name());

        loop {
            match fsm.state() {
                ConvergenceState::Attempting => {
                    match deployment
                        .repair_active_generation(force_operational, false)
                        .await
                    {
                        Ok(nodes) => {
                            for name in nodes {
                                if !activated.contains(&name) {
                                    activated.push(name);
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Failed to repair {}: {}", target, e);
                        }
                    }

                    let operational = match deployment.active_is_fully_operational().await {
                        Ok(operational) => operational,
                        Err(e) => {
                            warn!("Unable to check {}: {}", target, e);
                            false
                        }
                    };
                    if operational {
                        info!("Active generation is fully operational");
                    }
                    fsm.process(if operational {
                        ConvergenceEvent::Operational
                    } else {
                        ConvergenceEvent::NotOperational
                    })
                    .map_err(RolloutError::FsmError)?;
                }
                ConvergenceState::AwaitingHuman => {
                    let choice = self.escalate(
                        "Active generation not fully operational. Ignore/Retry/Fail (I/R/F)?",
                        &target,
                    )?;
                    fsm.process(ConvergenceEvent::Operator(choice))
                        .map_err(RolloutError::FsmError)?;
                }
                ConvergenceState::Converged => {
                    let outcome = if fsm.is_degraded() {
                        warn!("Leaving {} partially operational", target);
                        ConvergenceOutcome::Ignored
                    } else {
                        ConvergenceOutcome::Operational
                    };
                    return Ok(GenerationConvergence { outcome, activated });
                }
                ConvergenceState::Aborted => {
                    error!("Active generation not fully operational. Aborting");
                    return Err(RolloutError::ConvergenceAborted { target });
                }
            }
        }
    }

    /// One make-operational attempt followed by a settle wait. Returns whether
    /// the node ended up operational.
    async fn attempt_node(&self, node: &dyn Node) -> bool {
        if let Err(e) = node.make_operational().await {
            warn!("Failed to make node {} operational: {}", node.name(), e);
        }
        if node.is_operational().await {
            info!("Node {} now operational", node.name());
            return true;
        }

        // The load balancer can take a moment to pick the instance up
        let delay = self.ctx.convergence.settle_delay;
        info!("Waiting {:?} for node to become operational", delay);
        tokio::time::sleep(delay).await;

        if node.is_operational().await {
            info!("Node {} now operational", node.name());
            return true;
        }
        false
    }

    fn escalate(&self, message: &str, target: &str) -> Result<OperatorChoice, RolloutError> {
        if !self.ctx.interactive {
            error!("{} not operational and the run is non-interactive. Aborting", target);
            return Err(RolloutError::NonInteractive(format!(
                "{} not operational",
                target
            )));
        }
        ask_operator_choice(self.prompter, message)
    }
}
