//! Fleet collaborators
//!
//! The rollout core never talks to a cloud API itself. It only drives the
//! traits below: a [`Deployment`] knows the topology of one environment, a
//! [`Node`] is a single provisioned resource and a [`NodeDeployer`] knows how
//! to create and configure one node. A [`Backend`] builds all of them.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::RolloutError;
use crate::models::environment::{EnvironmentConfig, NodeConf};
use crate::models::generation::{AwsType, Generation};

/// A single provisioned cloud resource
#[async_trait]
pub trait Node: Send + Sync {
    /// Identity used in log messages and prompts
    fn name(&self) -> &str;

    /// Generation the node belongs to
    fn generation(&self) -> Generation;

    /// Currently registered with its service front end
    async fn is_operational(&self) -> bool;

    /// Currently passing its health check
    async fn is_healthy(&self) -> bool;

    /// Pull the node out of service
    async fn make_temporarily_inoperative(&self) -> Result<(), RolloutError>;

    /// Put the node back into service. May fail, e.g. while the node is still
    /// warming up.
    async fn make_operational(&self) -> Result<(), RolloutError>;

    /// Where the node's health check can be inspected by hand
    fn get_health_check_url(&self) -> Option<String>;
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("generation", &self.generation())
            .finish()
    }
}

/// One named environment with its active, pending and old generations
#[async_trait]
pub trait Deployment: Send + Sync {
    fn name(&self) -> &str;

    /// Fail when the cluster state is inconsistent. The old generation is
    /// skipped unless `verify_old` is set.
    async fn verify_deployment_state(&self, verify_old: bool) -> Result<(), RolloutError>;

    /// Whether enough other nodes stay in service to pull `node` safely
    async fn has_required_redundancy(&self, node: &dyn Node) -> Result<bool, RolloutError>;

    /// Make healthy active-generation nodes operational, or all of them when
    /// `force_operational` is set. Returns the names of the activated nodes.
    async fn repair_active_generation(
        &self,
        force_operational: bool,
        wait_until_operational: bool,
    ) -> Result<Vec<String>, RolloutError>;

    /// Whether every node of the active generation is operational
    async fn active_is_fully_operational(&self) -> Result<bool, RolloutError>;
}

/// Creates and configures one node
#[async_trait]
pub trait NodeDeployer: Send + Sync {
    fn node_name(&self) -> &str;

    fn aws_type(&self) -> AwsType;

    /// Whether this deployer targets the active generation
    fn is_active(&self) -> bool;

    /// Deployment the node belongs to
    fn deployment(&self) -> Arc<dyn Deployment>;

    /// Deployment new nodes are seeded from, if any
    fn seed_deployment(&self) -> Option<Arc<dyn Deployment>>;

    fn seed_node_name(&self) -> Option<&str>;

    /// Whether seeding a new node needs an operator confirmation
    fn seed_verification(&self) -> bool;

    /// The current node, `None` when it has not been created yet
    async fn get_node(&self) -> Result<Option<Arc<dyn Node>>, RolloutError>;

    async fn ensure_node_created(&self) -> Result<(), RolloutError>;

    /// Apply the node's configuration
    async fn run(&self) -> Result<(), RolloutError>;
}

impl fmt::Debug for dyn NodeDeployer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDeployer")
            .field("node_name", &self.node_name())
            .field("aws_type", &self.aws_type())
            .field("is_active", &self.is_active())
            .finish()
    }
}

/// Everything a backend needs to build one deployer
#[derive(Clone)]
pub struct DeployerSpec {
    pub deployment: Arc<dyn Deployment>,
    pub seed_deployment: Option<Arc<dyn Deployment>>,
    /// Generation the node is created and configured in
    pub generation: Generation,
    pub aws_type: AwsType,
    pub node_name: String,
    pub seed_node_name: Option<String>,
    pub seed_verification: bool,
    pub conf: NodeConf,
}

impl DeployerSpec {
    pub fn is_active(&self) -> bool {
        self.generation == Generation::Active
    }
}

/// Builds deployments and deployers for a cloud provider
pub trait Backend: Send + Sync {
    fn deployment(
        &self,
        name: &str,
        config: &EnvironmentConfig,
    ) -> Result<Arc<dyn Deployment>, RolloutError>;

    fn deployer(&self, spec: DeployerSpec) -> Result<Arc<dyn NodeDeployer>, RolloutError>;
}
