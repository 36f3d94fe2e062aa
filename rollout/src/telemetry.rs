//! Phase timing for rollout runs

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Duration of one named phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEntry {
    pub name: String,
    pub duration_secs: f64,
}

/// Collects phase durations of one run
#[derive(Debug, Clone, Default)]
pub struct Timer {
    entries: Vec<(String, Duration)>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a phase. Recording the same name twice adds up the durations.
    pub fn record(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, total)) => *total += duration,
            None => self.entries.push((name, duration)),
        }
    }

    /// Await `fut` and record how long it took
    pub async fn time<F, T>(&mut self, name: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        let output = fut.await;
        self.record(name, started.elapsed());
        output
    }

    /// Recorded phases, longest first
    pub fn breakdown(&self) -> Vec<TimingEntry> {
        let mut entries: Vec<TimingEntry> = self
            .entries
            .iter()
            .map(|(name, duration)| TimingEntry {
                name: name.clone(),
                duration_secs: duration.as_secs_f64(),
            })
            .collect();
        entries.sort_by(|a, b| b.duration_secs.total_cmp(&a.duration_secs));
        entries
    }

    /// Log the breakdown on the `timer` target
    pub fn log_breakdown(&self) {
        info!(target: "timer", "Timing Breakdown:");
        for entry in self.breakdown() {
            info!(target: "timer", "{:02}s- {}", entry.duration_secs as u64, entry.name);
        }
    }
}
