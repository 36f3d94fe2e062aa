//! Resource tracker models
//!
//! The tracker file records what the simulated fleet currently looks like:
//! every provisioned node with its generation and service state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::generation::{AwsType, Generation};

/// All tracked environments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub environments: BTreeMap<String, TrackedEnvironment>,
}

/// Provisioned resources of one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEnvironment {
    /// Number of other operational nodes that must stay in service while a
    /// node of the same generation is pulled
    #[serde(default = "default_min_redundancy")]
    pub min_redundancy: usize,

    #[serde(default)]
    pub nodes: Vec<TrackedNode>,
}

fn default_min_redundancy() -> usize {
    1
}

impl Default for TrackedEnvironment {
    fn default() -> Self {
        Self {
            min_redundancy: default_min_redundancy(),
            nodes: Vec::new(),
        }
    }
}

impl TrackedEnvironment {
    /// Find a node by name within a generation
    pub fn node(&self, name: &str, generation: Generation) -> Option<&TrackedNode> {
        self.nodes
            .iter()
            .find(|n| n.name == name && n.generation == generation)
    }

    /// Find a node by name within a generation, mutably
    pub fn node_mut(&mut self, name: &str, generation: Generation) -> Option<&mut TrackedNode> {
        self.nodes
            .iter_mut()
            .find(|n| n.name == name && n.generation == generation)
    }
}

/// One provisioned node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedNode {
    pub name: String,
    pub generation: Generation,
    pub aws_type: AwsType,

    /// Registered with its load balancer
    #[serde(default)]
    pub operational: bool,

    /// Passing its health check
    #[serde(default)]
    pub healthy: bool,

    #[serde(default)]
    pub health_check_url: Option<String>,

    /// Number of times configuration was applied
    #[serde(default)]
    pub revision: u64,

    /// `<environment>/<node>` this node was cloned from
    #[serde(default)]
    pub seeded_from: Option<String>,

    #[serde(default)]
    pub configured_at: Option<DateTime<Utc>>,
}
