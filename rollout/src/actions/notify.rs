//! Run announcements

use std::time::Duration;

use tracing::info;

use crate::app::options::RunContext;

/// Start or end of an action
#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    Started {
        action: &'static str,
    },
    Finished {
        action: &'static str,
        duration: Duration,
    },
}

/// Side channel told about runs starting and finishing
pub trait Notifier: Send + Sync {
    fn announce(&self, ctx: &RunContext, announcement: &Announcement);
}

/// Announces through the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn announce(&self, ctx: &RunContext, announcement: &Announcement) {
        match announcement {
            Announcement::Started { action } => info!(
                run_id = %ctx.run_id,
                "Starting {} of {} {}",
                action,
                ctx.environment,
                ctx.generation
            ),
            Announcement::Finished { action, duration } => info!(
                run_id = %ctx.run_id,
                "Finished {} of {} {}. Took: {}s",
                action,
                ctx.environment,
                ctx.generation,
                duration.as_secs()
            ),
        }
    }
}
