//! Seamless rotation of a node around a mutation
//!
//! A rotation has three steps: [`SeamlessRotation::prepare`] checks
//! redundancy and pulls an operational node out of service, the caller
//! mutates the node, and [`SeamlessRotation::restore`] brings service back
//! through the convergence loop. [`SeamlessRotation::run`] chains the three
//! and restores even when the mutation fails.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::options::RunContext;
use crate::deploy::convergence::{ConvergenceOutcome, Converger};
use crate::deploy::prompt::{confirm, Prompter};
use crate::errors::RolloutError;
use crate::fleet::{Deployment, Node};

/// Rotation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOptions {
    /// Refuse to pull a node without the required redundancy unless the
    /// operator agrees
    pub force_seamless: bool,

    /// Make the node operational afterwards even if it was not before
    pub make_operational_if_not_already: bool,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            force_seamless: true,
            make_operational_if_not_already: false,
        }
    }
}

/// What `restore` has to do, decided by `prepare`
#[derive(Debug)]
pub struct RotationPlan {
    node: Option<Arc<dyn Node>>,
    restore: bool,
    pulled: bool,
}

impl RotationPlan {
    /// Whether service will be restored after the mutation
    pub fn restores(&self) -> bool {
        self.restore
    }

    /// Whether the node was taken out of service
    pub fn pulled(&self) -> bool {
        self.pulled
    }
}

/// Rotation protocol bound to one deployment
pub struct SeamlessRotation<'a> {
    ctx: &'a RunContext,
    prompter: &'a dyn Prompter,
    deployment: &'a dyn Deployment,
}

impl<'a> SeamlessRotation<'a> {
    pub fn new(
        ctx: &'a RunContext,
        prompter: &'a dyn Prompter,
        deployment: &'a dyn Deployment,
    ) -> Self {
        Self {
            ctx,
            prompter,
            deployment,
        }
    }

    /// Check redundancy and take an operational node out of service.
    ///
    /// Fails without touching the node when the required redundancy is
    /// missing and nobody agreed to an interruption.
    pub async fn prepare(
        &self,
        node: Option<Arc<dyn Node>>,
        options: RotationOptions,
    ) -> Result<RotationPlan, RolloutError> {
        let mut restore = options.make_operational_if_not_already;
        let mut pulled = false;

        if let Some(node) = &node {
            if options.force_seamless {
                self.ensure_redundancy(node.as_ref()).await?;
            }

            if node.is_operational().await {
                restore = true;
                info!("Making temporarily inoperative: {}", node.name());
                node.make_temporarily_inoperative().await?;
                pulled = true;
                info!("Node {} now inoperative", node.name());
            }
        }

        Ok(RotationPlan {
            node,
            restore,
            pulled,
        })
    }

    /// Bring service back as decided by `prepare`. Returns `None` when there
    /// was nothing to restore.
    pub async fn restore(
        &self,
        plan: RotationPlan,
    ) -> Result<Option<ConvergenceOutcome>, RolloutError> {
        if !plan.restore {
            return Ok(None);
        }

        let converger = Converger::new(self.ctx, self.prompter);
        let outcome = match &plan.node {
            Some(node) => {
                info!("Restoring operation: {}", node.name());
                converger.converge_node(node.as_ref()).await?
            }
            None => {
                // A brand new node without an individual handle
                info!(
                    "Restoring operation of the active generation of {}",
                    self.deployment.name()
                );
                converger
                    .converge_generation(self.deployment, true)
                    .await?
                    .outcome
            }
        };
        Ok(Some(outcome))
    }

    /// Run `mutate` with the node out of service, then restore it. Returns
    /// the mutation's output along with how the restore step ended.
    ///
    /// A failed mutation is reported after the restore step ran. When the
    /// restore step aborts the run, that abort wins.
    pub async fn run<F, Fut, T>(
        &self,
        node: Option<Arc<dyn Node>>,
        options: RotationOptions,
        mutate: F,
    ) -> Result<(T, Option<ConvergenceOutcome>), RolloutError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RolloutError>>,
    {
        let plan = self.prepare(node, options).await?;

        let result = mutate().await;
        if let Err(e) = &result {
            warn!("Mutation failed, restoring service before reporting it: {}", e);
        }

        match self.restore(plan).await {
            Ok(restored) => result.map(|output| (output, restored)),
            Err(restore_error) => {
                if let Err(e) = result {
                    error!("Mutation error superseded by restore failure: {}", e);
                }
                Err(restore_error)
            }
        }
    }

    async fn ensure_redundancy(&self, node: &dyn Node) -> Result<(), RolloutError> {
        if self.deployment.has_required_redundancy(node).await? {
            return Ok(());
        }

        if self.ctx.interactive {
            let message = format!(
                "\n\nNot possible to avoid service interruption to node {}. Continue anyway? (Y/N)",
                node.name()
            );
            if confirm(self.prompter, &message, "Y")? {
                warn!("Continuing without redundancy for node {}", node.name());
                return Ok(());
            }
            error!(
                "Node {} doesn't have required redundancy. Aborting",
                node.name()
            );
        } else {
            error!(
                "Not possible to avoid service interruption to node {}",
                node.name()
            );
            error!("Deployment marked non-interactive. Aborting.");
        }

        Err(RolloutError::UnsafeRotation {
            node: node.name().to_string(),
        })
    }
}
