//! Counting fakes of the fleet collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rollout::actions::notify::{Announcement, Notifier};
use rollout::app::options::RunContext;
use rollout::deploy::fsm::ConvergenceSettings;
use rollout::errors::RolloutError;
use rollout::fleet::{Deployment, Node, NodeDeployer};
use rollout::models::generation::{AwsType, Generation};

/// Context with no settle delay
pub fn test_ctx(auto_retries: u32) -> RunContext {
    RunContext::new("staging", Generation::Active).with_convergence(ConvergenceSettings {
        auto_retries,
        settle_delay: Duration::ZERO,
    })
}

pub struct FakeNode {
    name: String,
    operational: AtomicBool,
    healthy: AtomicBool,
    /// `make_operational` call that brings the node up, `None` for never
    comes_up_on: Option<u32>,
    make_operational_calls: AtomicU32,
    inoperative_calls: AtomicU32,
}

impl FakeNode {
    /// Node that comes up on the first `make_operational` call
    pub fn new(name: &str, operational: bool, healthy: bool) -> Arc<Self> {
        Self::coming_up_on(name, operational, healthy, Some(1))
    }

    pub fn coming_up_on(
        name: &str,
        operational: bool,
        healthy: bool,
        comes_up_on: Option<u32>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            operational: AtomicBool::new(operational),
            healthy: AtomicBool::new(healthy),
            comes_up_on,
            make_operational_calls: AtomicU32::new(0),
            inoperative_calls: AtomicU32::new(0),
        })
    }

    /// Node that never becomes operational
    pub fn stuck(name: &str) -> Arc<Self> {
        Self::coming_up_on(name, false, false, None)
    }

    pub fn operational(&self) -> bool {
        self.operational.load(Ordering::SeqCst)
    }

    pub fn make_operational_calls(&self) -> u32 {
        self.make_operational_calls.load(Ordering::SeqCst)
    }

    pub fn inoperative_calls(&self) -> u32 {
        self.inoperative_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node for FakeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn generation(&self) -> Generation {
        Generation::Active
    }

    async fn is_operational(&self) -> bool {
        self.operational()
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn make_temporarily_inoperative(&self) -> Result<(), RolloutError> {
        self.inoperative_calls.fetch_add(1, Ordering::SeqCst);
        self.operational.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn make_operational(&self) -> Result<(), RolloutError> {
        let call = self.make_operational_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.comes_up_on {
            Some(up_on) if call >= up_on => {
                self.operational.store(true, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(RolloutError::CollaboratorError(format!(
                "{} still registering",
                self.name
            ))),
        }
    }

    fn get_health_check_url(&self) -> Option<String> {
        Some(format!("http://{}/health", self.name))
    }
}

pub struct FakeDeployment {
    name: String,
    redundant: bool,
    /// Node names returned by successive repair calls
    repairs: Mutex<VecDeque<Vec<String>>>,
    /// Repair calls after which the generation is fully operational
    operational_after: Option<u32>,
    repair_calls: AtomicU32,
    redundancy_checks: AtomicU32,
    last_force: Mutex<Option<bool>>,
    verified_old: Mutex<Vec<bool>>,
}

impl FakeDeployment {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            redundant: true,
            repairs: Mutex::new(VecDeque::new()),
            operational_after: Some(0),
            repair_calls: AtomicU32::new(0),
            redundancy_checks: AtomicU32::new(0),
            last_force: Mutex::new(None),
            verified_old: Mutex::new(Vec::new()),
        }
    }

    pub fn with_redundancy(mut self, redundant: bool) -> Self {
        self.redundant = redundant;
        self
    }

    pub fn with_repairs(self, repairs: Vec<Vec<&str>>) -> Self {
        *self.repairs.lock().unwrap() = repairs
            .into_iter()
            .map(|names| names.into_iter().map(str::to_string).collect())
            .collect();
        self
    }

    pub fn operational_after(mut self, repair_calls: Option<u32>) -> Self {
        self.operational_after = repair_calls;
        self
    }

    pub fn repair_calls(&self) -> u32 {
        self.repair_calls.load(Ordering::SeqCst)
    }

    pub fn redundancy_checks(&self) -> u32 {
        self.redundancy_checks.load(Ordering::SeqCst)
    }

    pub fn last_force(&self) -> Option<bool> {
        *self.last_force.lock().unwrap()
    }

    pub fn verified_old(&self) -> Vec<bool> {
        self.verified_old.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deployment for FakeDeployment {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_deployment_state(&self, verify_old: bool) -> Result<(), RolloutError> {
        self.verified_old.lock().unwrap().push(verify_old);
        Ok(())
    }

    async fn has_required_redundancy(&self, _node: &dyn Node) -> Result<bool, RolloutError> {
        self.redundancy_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.redundant)
    }

    async fn repair_active_generation(
        &self,
        force_operational: bool,
        _wait_until_operational: bool,
    ) -> Result<Vec<String>, RolloutError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_force.lock().unwrap() = Some(force_operational);
        Ok(self.repairs.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn active_is_fully_operational(&self) -> Result<bool, RolloutError> {
        Ok(self
            .operational_after
            .is_some_and(|after| self.repair_calls() >= after))
    }
}

pub struct FakeDeployer {
    name: String,
    node: Mutex<Option<Arc<FakeNode>>>,
    deployment: Arc<FakeDeployment>,
    seed: Option<(Arc<FakeDeployment>, String)>,
    seed_verification: bool,
    ensure_calls: AtomicU32,
    run_calls: AtomicU32,
}

impl FakeDeployer {
    pub fn new(name: &str, node: Option<Arc<FakeNode>>, deployment: Arc<FakeDeployment>) -> Self {
        Self {
            name: name.to_string(),
            node: Mutex::new(node),
            deployment,
            seed: None,
            seed_verification: false,
            ensure_calls: AtomicU32::new(0),
            run_calls: AtomicU32::new(0),
        }
    }

    pub fn with_seed(mut self, seed: Arc<FakeDeployment>, seed_node: &str, verify: bool) -> Self {
        self.seed = Some((seed, seed_node.to_string()));
        self.seed_verification = verify;
        self
    }

    pub fn ensure_calls(&self) -> u32 {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeDeployer for FakeDeployer {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn aws_type(&self) -> AwsType {
        AwsType::Ec2
    }

    fn is_active(&self) -> bool {
        true
    }

    fn deployment(&self) -> Arc<dyn Deployment> {
        self.deployment.clone()
    }

    fn seed_deployment(&self) -> Option<Arc<dyn Deployment>> {
        self.seed
            .as_ref()
            .map(|(seed, _)| seed.clone() as Arc<dyn Deployment>)
    }

    fn seed_node_name(&self) -> Option<&str> {
        self.seed.as_ref().map(|(_, node)| node.as_str())
    }

    fn seed_verification(&self) -> bool {
        self.seed_verification
    }

    async fn get_node(&self) -> Result<Option<Arc<dyn Node>>, RolloutError> {
        Ok(self
            .node
            .lock()
            .unwrap()
            .clone()
            .map(|node| node as Arc<dyn Node>))
    }

    async fn ensure_node_created(&self) -> Result<(), RolloutError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let mut node = self.node.lock().unwrap();
        if node.is_none() {
            *node = Some(FakeNode::new(&self.name, false, true));
        }
        Ok(())
    }

    async fn run(&self) -> Result<(), RolloutError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps every announcement
#[derive(Default)]
pub struct RecordingNotifier {
    announcements: Mutex<Vec<Announcement>>,
}

impl RecordingNotifier {
    pub fn announcements(&self) -> Vec<Announcement> {
        self.announcements.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn announce(&self, _ctx: &RunContext, announcement: &Announcement) {
        self.announcements
            .lock()
            .unwrap()
            .push(announcement.clone());
    }
}
