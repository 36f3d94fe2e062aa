//! Repair action: make every healthy active-generation node operational

use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::actions::notify::{Announcement, Notifier};
use crate::app::options::RunContext;
use crate::deploy::convergence::{ConvergenceOutcome, Converger};
use crate::deploy::prompt::Prompter;
use crate::errors::RolloutError;
use crate::fleet::Deployment;

const ACTION: &str = "repair";

/// Outcome of a repair run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Nodes made operational by the repair
    pub activated: Vec<String>,

    /// Whether the operator accepted a partially operational generation
    pub degraded: bool,
}

impl RepairReport {
    /// Human readable summary
    pub fn summary(&self) -> String {
        if self.activated.is_empty() {
            "No nodes modified".to_string()
        } else {
            format!(
                "Succesfully made {} node(s) operational",
                self.activated.len()
            )
        }
    }
}

/// Ensure that all healthy active-generation nodes are operational. With
/// `force_operational` unhealthy nodes are put into service too.
pub async fn repair(
    ctx: &RunContext,
    deployment: &dyn Deployment,
    prompter: &dyn Prompter,
    notifier: &dyn Notifier,
    force_operational: bool,
) -> Result<RepairReport, RolloutError> {
    let started = Instant::now();
    notifier.announce(ctx, &Announcement::Started { action: ACTION });
    info!(run_id = %ctx.run_id, "Repairing {}", deployment.name());

    deployment.verify_deployment_state(true).await?;

    let converged = Converger::new(ctx, prompter)
        .converge_generation(deployment, force_operational)
        .await?;

    let report = RepairReport {
        activated: converged.activated,
        degraded: converged.outcome == ConvergenceOutcome::Ignored,
    };
    info!("{}", report.summary());

    notifier.announce(
        ctx,
        &Announcement::Finished {
            action: ACTION,
            duration: started.elapsed(),
        },
    );
    Ok(report)
}

/// Parse the `y`/`n` force flag of the repair action
pub fn parse_force_flag(value: &str) -> Result<bool, String> {
    match value {
        "y" | "Y" => Ok(true),
        "n" | "N" => Ok(false),
        other => Err(format!("Expected y or n, got {}", other)),
    }
}
