//! Rollout priority ordering
//!
//! Deployers are processed worst node first, so that a run stopped halfway
//! leaves the fleet in the best state reachable so far.

use std::sync::Arc;

use tracing::debug;

use crate::errors::RolloutError;
use crate::fleet::NodeDeployer;

/// Service state of a deployer's node, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeStatus {
    /// Out of service and failing its health check, or not created yet
    InoperativeUnhealthy,
    InoperativeHealthy,
    OperationalUnhealthy,
    OperationalHealthy,
}

impl NodeStatus {
    pub fn from_flags(is_operational: bool, is_healthy: bool) -> Self {
        match (is_operational, is_healthy) {
            (false, false) => NodeStatus::InoperativeUnhealthy,
            (false, true) => NodeStatus::InoperativeHealthy,
            (true, false) => NodeStatus::OperationalUnhealthy,
            (true, true) => NodeStatus::OperationalHealthy,
        }
    }

    fn bucket(&self) -> usize {
        *self as usize
    }
}

/// Read a deployer's node once and classify it
pub async fn classify(deployer: &dyn NodeDeployer) -> Result<NodeStatus, RolloutError> {
    let status = match deployer.get_node().await? {
        Some(node) => NodeStatus::from_flags(node.is_operational().await, node.is_healthy().await),
        None => NodeStatus::InoperativeUnhealthy,
    };
    debug!("Node {} classified as {:?}", deployer.node_name(), status);
    Ok(status)
}

/// Reorder deployers so the least safe nodes come first:
///
///  1. Inoperative, unhealthy nodes
///  2. Inoperative, healthy nodes
///  3. Operational, unhealthy nodes
///  4. Operational, healthy nodes
///
/// Deployers keep their relative order within a group.
pub async fn order_by_priority(
    deployers: Vec<Arc<dyn NodeDeployer>>,
) -> Result<Vec<Arc<dyn NodeDeployer>>, RolloutError> {
    let mut buckets: [Vec<Arc<dyn NodeDeployer>>; 4] = Default::default();

    for deployer in deployers {
        let status = classify(deployer.as_ref()).await?;
        buckets[status.bucket()].push(deployer);
    }

    Ok(buckets.into_iter().flatten().collect())
}
