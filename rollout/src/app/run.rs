//! Wiring of the CLI actions to the file based collaborators

use tracing::{error, info};

use crate::actions::notify::LogNotifier;
use crate::actions::repair::{repair, RepairReport};
use crate::actions::up::{Up, UpReport};
use crate::app::options::RunContext;
use crate::deploy::prompt::Prompter;
use crate::errors::RolloutError;
use crate::filesys::file::File;
use crate::fleet::memory::MemoryFleet;
use crate::fleet::Backend;
use crate::storage::environments::{ConfigurationManager, FileConfigurationManager};

/// Files an action reads and writes
#[derive(Debug, Clone)]
pub struct ActionFiles {
    /// Environments configuration
    pub environments: File,

    /// Resource tracker, written back after the run
    pub tracker: File,
}

/// Run the up action against the tracked fleet
pub async fn run_up(
    ctx: &RunContext,
    files: &ActionFiles,
    prompter: &dyn Prompter,
) -> Result<UpReport, RolloutError> {
    let configuration = FileConfigurationManager::load(&files.environments).await?;
    let fleet = MemoryFleet::load(&files.tracker).await?;

    let result = Up {
        ctx,
        configuration: &configuration,
        backend: &fleet,
        prompter,
        notifier: &LogNotifier,
    }
    .run()
    .await;

    persist(&fleet, &files.tracker, result).await
}

/// Run the repair action against the tracked fleet
pub async fn run_repair(
    ctx: &RunContext,
    files: &ActionFiles,
    prompter: &dyn Prompter,
    force_operational: bool,
) -> Result<RepairReport, RolloutError> {
    let configuration = FileConfigurationManager::load(&files.environments).await?;
    let fleet = MemoryFleet::load(&files.tracker).await?;

    let environment_config = configuration.get_environment_config(&ctx.environment)?;
    let deployment = fleet.deployment(&ctx.environment, &environment_config)?;
    let result = repair(
        ctx,
        deployment.as_ref(),
        prompter,
        &LogNotifier,
        force_operational,
    )
    .await;

    persist(&fleet, &files.tracker, result).await
}

/// Save the fleet whatever the outcome, nodes may have changed before an
/// abort
async fn persist<T>(
    fleet: &MemoryFleet,
    tracker: &File,
    result: Result<T, RolloutError>,
) -> Result<T, RolloutError> {
    match fleet.save(tracker).await {
        Ok(()) => info!("Tracker saved to {}", tracker.path().display()),
        Err(e) => {
            error!("Failed to save tracker {}: {}", tracker.path().display(), e);
            if result.is_ok() {
                return Err(e);
            }
        }
    }
    result
}
