//! Simulated fleet backed by a resource tracker file
//!
//! Every handle shares one [`Tracker`] behind a lock. Nothing leaves the
//! process until [`MemoryFleet::save`] writes the tracker back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::RolloutError;
use crate::filesys::file::File;
use crate::fleet::{Backend, Deployment, DeployerSpec, Node, NodeDeployer};
use crate::models::environment::{EnvironmentConfig, NodeConf};
use crate::models::generation::{AwsType, Generation};
use crate::models::tracker::{TrackedNode, Tracker};

/// In-memory fleet
#[derive(Debug, Clone, Default)]
pub struct MemoryFleet {
    state: Arc<RwLock<Tracker>>,
}

impl MemoryFleet {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            state: Arc::new(RwLock::new(tracker)),
        }
    }

    /// Load the fleet from a tracker file. A missing file is an empty fleet.
    pub async fn load(file: &File) -> Result<Self, RolloutError> {
        let tracker: Tracker = file.read_json_or_default().await?;
        debug!(
            "Loaded tracker {} with {} environment(s)",
            file.path().display(),
            tracker.environments.len()
        );
        Ok(Self::new(tracker))
    }

    /// Write the current fleet state back to a tracker file
    pub async fn save(&self, file: &File) -> Result<(), RolloutError> {
        let tracker = self.state.read().await;
        file.write_json(&*tracker).await?;
        debug!("Saved tracker {}", file.path().display());
        Ok(())
    }

    /// Copy of the current fleet state
    pub async fn snapshot(&self) -> Tracker {
        self.state.read().await.clone()
    }
}

impl Backend for MemoryFleet {
    fn deployment(
        &self,
        name: &str,
        config: &EnvironmentConfig,
    ) -> Result<Arc<dyn Deployment>, RolloutError> {
        Ok(Arc::new(MemoryDeployment {
            name: name.to_string(),
            config: config.clone(),
            state: self.state.clone(),
        }))
    }

    fn deployer(&self, spec: DeployerSpec) -> Result<Arc<dyn NodeDeployer>, RolloutError> {
        let seed_origin = match (&spec.seed_deployment, &spec.seed_node_name) {
            (Some(seed), Some(node)) => Some((seed.name().to_string(), node.clone())),
            _ => None,
        };
        Ok(Arc::new(MemoryDeployer {
            environment: spec.deployment.name().to_string(),
            generation: spec.generation,
            seed_origin,
            spec,
            state: self.state.clone(),
        }))
    }
}

/// One environment of the simulated fleet
pub struct MemoryDeployment {
    name: String,
    config: EnvironmentConfig,
    state: Arc<RwLock<Tracker>>,
}

#[async_trait]
impl Deployment for MemoryDeployment {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_deployment_state(&self, verify_old: bool) -> Result<(), RolloutError> {
        let tracker = self.state.read().await;
        let Some(env) = tracker.environments.get(&self.name) else {
            debug!("Environment {} has no provisioned nodes", self.name);
            return Ok(());
        };

        for (index, node) in env.nodes.iter().enumerate() {
            if node.generation == Generation::Old && !verify_old {
                continue;
            }
            if !self.config.has_node(&node.name) {
                return Err(RolloutError::CollaboratorError(format!(
                    "Node {} in the {} generation of {} has no configuration",
                    node.name, node.generation, self.name
                )));
            }
            let duplicated = env.nodes[index + 1..]
                .iter()
                .any(|other| other.name == node.name && other.generation == node.generation);
            if duplicated {
                return Err(RolloutError::CollaboratorError(format!(
                    "Node {} is tracked twice in the {} generation of {}",
                    node.name, node.generation, self.name
                )));
            }
        }

        Ok(())
    }

    async fn has_required_redundancy(&self, node: &dyn Node) -> Result<bool, RolloutError> {
        let tracker = self.state.read().await;
        let Some(env) = tracker.environments.get(&self.name) else {
            return Ok(true);
        };

        // Pulling a node that serves nothing interrupts nothing
        let Some(target) = env
            .node(node.name(), node.generation())
            .filter(|n| n.operational)
        else {
            return Ok(true);
        };

        let others_in_service = env
            .nodes
            .iter()
            .filter(|n| {
                n.generation == target.generation
                    && n.aws_type == AwsType::Ec2
                    && n.operational
                    && n.name != target.name
            })
            .count();

        debug!(
            "Node {} has {} other operational node(s), {} required",
            node.name(),
            others_in_service,
            env.min_redundancy
        );
        Ok(others_in_service >= env.min_redundancy)
    }

    async fn repair_active_generation(
        &self,
        force_operational: bool,
        _wait_until_operational: bool,
    ) -> Result<Vec<String>, RolloutError> {
        let mut tracker = self.state.write().await;
        let Some(env) = tracker.environments.get_mut(&self.name) else {
            return Ok(Vec::new());
        };

        let mut activated = Vec::new();
        for node in env.nodes.iter_mut().filter(|n| {
            n.generation == Generation::Active && n.aws_type == AwsType::Ec2 && !n.operational
        }) {
            if node.healthy || force_operational {
                node.operational = true;
                info!("Made {} operational", node.name);
                activated.push(node.name.clone());
            } else {
                debug!("Skipping unhealthy node {}", node.name);
            }
        }

        // Registration is synchronous here, nothing to wait for
        Ok(activated)
    }

    async fn active_is_fully_operational(&self) -> Result<bool, RolloutError> {
        let tracker = self.state.read().await;
        Ok(tracker
            .environments
            .get(&self.name)
            .map(|env| {
                env.nodes
                    .iter()
                    .filter(|n| n.generation == Generation::Active && n.aws_type == AwsType::Ec2)
                    .all(|n| n.operational)
            })
            .unwrap_or(true))
    }
}

/// Handle to one tracked node
pub struct MemoryNode {
    name: String,
    environment: String,
    generation: Generation,
    health_check_url: Option<String>,
    state: Arc<RwLock<Tracker>>,
}

impl MemoryNode {
    async fn read<T>(&self, f: impl FnOnce(&TrackedNode) -> T) -> Option<T> {
        let tracker = self.state.read().await;
        tracker
            .environments
            .get(&self.environment)
            .and_then(|env| env.node(&self.name, self.generation))
            .map(f)
    }

    async fn update<T>(&self, f: impl FnOnce(&mut TrackedNode) -> T) -> Result<T, RolloutError> {
        let mut tracker = self.state.write().await;
        tracker
            .environments
            .get_mut(&self.environment)
            .and_then(|env| env.node_mut(&self.name, self.generation))
            .map(f)
            .ok_or_else(|| RolloutError::NotFound(format!("node {}", self.name)))
    }
}

#[async_trait]
impl Node for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn generation(&self) -> Generation {
        self.generation
    }

    async fn is_operational(&self) -> bool {
        self.read(|n| n.operational).await.unwrap_or(false)
    }

    async fn is_healthy(&self) -> bool {
        self.read(|n| n.healthy).await.unwrap_or(false)
    }

    async fn make_temporarily_inoperative(&self) -> Result<(), RolloutError> {
        self.update(|n| n.operational = false).await
    }

    async fn make_operational(&self) -> Result<(), RolloutError> {
        self.update(|n| {
            if n.healthy {
                n.operational = true;
                Ok(())
            } else {
                Err(RolloutError::CollaboratorError(format!(
                    "Node {} is failing its health check",
                    n.name
                )))
            }
        })
        .await?
    }

    fn get_health_check_url(&self) -> Option<String> {
        self.health_check_url.clone()
    }
}

/// Creates and configures tracked nodes
pub struct MemoryDeployer {
    environment: String,
    generation: Generation,
    seed_origin: Option<(String, String)>,
    spec: DeployerSpec,
    state: Arc<RwLock<Tracker>>,
}

impl MemoryDeployer {
    fn conf(&self) -> &NodeConf {
        &self.spec.conf
    }

    async fn ensure_seed_exists(&self, seed_env: &str, seed_node: &str) -> Result<(), RolloutError> {
        let tracker = self.state.read().await;
        let found = tracker
            .environments
            .get(seed_env)
            .and_then(|env| env.node(seed_node, Generation::Active))
            .is_some();
        if found {
            Ok(())
        } else {
            Err(RolloutError::NotFound(format!(
                "seed node {} in {}",
                seed_node, seed_env
            )))
        }
    }
}

#[async_trait]
impl NodeDeployer for MemoryDeployer {
    fn node_name(&self) -> &str {
        &self.spec.node_name
    }

    fn aws_type(&self) -> AwsType {
        self.spec.aws_type
    }

    fn is_active(&self) -> bool {
        self.spec.is_active()
    }

    fn deployment(&self) -> Arc<dyn Deployment> {
        self.spec.deployment.clone()
    }

    fn seed_deployment(&self) -> Option<Arc<dyn Deployment>> {
        self.spec.seed_deployment.clone()
    }

    fn seed_node_name(&self) -> Option<&str> {
        self.spec.seed_node_name.as_deref()
    }

    fn seed_verification(&self) -> bool {
        self.spec.seed_verification
    }

    async fn get_node(&self) -> Result<Option<Arc<dyn Node>>, RolloutError> {
        let tracker = self.state.read().await;
        let node = tracker
            .environments
            .get(&self.environment)
            .and_then(|env| env.node(&self.spec.node_name, self.generation));

        Ok(node.map(|n| {
            Arc::new(MemoryNode {
                name: n.name.clone(),
                environment: self.environment.clone(),
                generation: self.generation,
                health_check_url: n.health_check_url.clone(),
                state: self.state.clone(),
            }) as Arc<dyn Node>
        }))
    }

    async fn ensure_node_created(&self) -> Result<(), RolloutError> {
        if self.get_node().await?.is_some() {
            debug!("Node {} already exists", self.spec.node_name);
            return Ok(());
        }

        let seeded_from = match &self.seed_origin {
            Some((seed_env, seed_node)) => {
                self.ensure_seed_exists(seed_env, seed_node).await?;
                Some(format!("{}/{}", seed_env, seed_node))
            }
            None => None,
        };

        let health_check_url = self
            .conf()
            .extra
            .get("health_check_url")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let mut tracker = self.state.write().await;
        let env = tracker
            .environments
            .entry(self.environment.clone())
            .or_default();
        env.nodes.push(TrackedNode {
            name: self.spec.node_name.clone(),
            generation: self.generation,
            aws_type: self.spec.aws_type,
            operational: false,
            healthy: true,
            health_check_url,
            revision: 0,
            seeded_from: seeded_from.clone(),
            configured_at: None,
        });

        match seeded_from {
            Some(origin) => info!(
                "Created {} node {} from {}",
                self.spec.aws_type, self.spec.node_name, origin
            ),
            None => info!("Created {} node {}", self.spec.aws_type, self.spec.node_name),
        }
        Ok(())
    }

    async fn run(&self) -> Result<(), RolloutError> {
        let mut tracker = self.state.write().await;
        let node = tracker
            .environments
            .get_mut(&self.environment)
            .and_then(|env| env.node_mut(&self.spec.node_name, self.generation))
            .ok_or_else(|| RolloutError::NotFound(format!("node {}", self.spec.node_name)))?;

        node.revision += 1;
        node.healthy = true;
        node.configured_at = Some(Utc::now());
        info!(
            "Configured {} node {} (revision {})",
            node.aws_type, node.name, node.revision
        );
        Ok(())
    }
}
