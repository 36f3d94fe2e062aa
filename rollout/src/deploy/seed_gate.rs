//! Seed data verification gate

use tracing::{error, info};

use crate::app::options::RunContext;
use crate::deploy::prompt::Prompter;
use crate::errors::RolloutError;
use crate::fleet::NodeDeployer;

const OPTIONS: [&str; 2] = ["Yes", "No"];

/// Whether creating this deployer's node needs the operator's confirmation:
/// seed verification is requested and the node does not exist yet
pub async fn requires_seed_verification(
    deployer: &dyn NodeDeployer,
) -> Result<bool, RolloutError> {
    if !deployer.seed_verification() {
        return Ok(false);
    }
    Ok(deployer.get_node().await?.is_none())
}

/// Ask the operator to confirm that the seed node may be affected. Anything
/// but `Yes` aborts the run.
pub fn prompt_for_seed_verification(
    ctx: &RunContext,
    prompter: &dyn Prompter,
    deployer: &dyn NodeDeployer,
) -> Result<(), RolloutError> {
    let seed_deployment = deployer
        .seed_deployment()
        .map(|d| d.name().to_string())
        .unwrap_or_else(|| "<none>".to_string());
    let seed_node = deployer.seed_node_name().unwrap_or("<none>").to_string();
    let seed = format!("{}-{}", seed_deployment, seed_node);

    if !ctx.interactive {
        error!(
            "Node {} requires seed data verification and the run is non-interactive. Aborting",
            seed
        );
        return Err(RolloutError::NonInteractive(format!(
            "seed verification of {}",
            seed
        )));
    }

    let message = format!(
        "Requiring seed data verification. Node {} WILL be affected Continue? ({})?",
        seed,
        OPTIONS.join("/")
    );
    let answer = prompter.choose(&message, &OPTIONS)?;
    if answer != "Yes" {
        error!("Node {} would be affected. Aborting deployment", seed);
        return Err(RolloutError::ConfirmationRefused(format!(
            "seed node {} would be affected",
            seed
        )));
    }

    info!("Seed data verification confirmed for {}", seed);
    Ok(())
}

/// Create the deployer's node, asking for seed verification first when
/// required. Nothing is created when the operator refuses.
pub async fn provision_node(
    ctx: &RunContext,
    prompter: &dyn Prompter,
    deployer: &dyn NodeDeployer,
) -> Result<(), RolloutError> {
    if requires_seed_verification(deployer).await? {
        prompt_for_seed_verification(ctx, prompter, deployer)?;
    }
    deployer.ensure_node_created().await
}
