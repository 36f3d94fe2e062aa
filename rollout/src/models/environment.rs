//! Environment configuration models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Configuration of one named environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment whose data new nodes are cloned from
    #[serde(default)]
    pub seed_environment: Option<String>,

    /// EC2 nodes keyed by node name
    #[serde(default)]
    pub ec2: BTreeMap<String, NodeConf>,

    /// RDS nodes keyed by node name
    #[serde(default)]
    pub rds: BTreeMap<String, NodeConf>,

    /// Load balancers, passed through untouched
    #[serde(default)]
    pub elb: BTreeMap<String, serde_json::Value>,
}

impl EnvironmentConfig {
    /// Whether a node with this name is configured, whatever its kind
    pub fn has_node(&self, node_name: &str) -> bool {
        self.ec2.contains_key(node_name) || self.rds.contains_key(node_name)
    }
}

/// Configuration of one node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConf {
    /// Seed node new instances are copied from
    #[serde(default)]
    pub seed: Option<SeedConf>,

    /// Deployment specific tweaks, passed to the deployer as is
    #[serde(default)]
    pub brain_wrinkles: serde_json::Map<String, serde_json::Value>,

    /// Everything else the provisioner understands
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Seed node reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConf {
    /// Name of the node in the seed environment
    pub unique_id: String,

    /// Require an operator confirmation before a new node is seeded
    #[serde(default)]
    pub verify: bool,
}
