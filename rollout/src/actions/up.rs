//! Up action: bring one generation of an environment up to date
//!
//! RDS nodes are created and configured first. EC2 nodes are then deployed
//! one at a time, worst node first, each rotated out of service around its
//! configuration run.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::actions::notify::{Announcement, Notifier};
use crate::app::options::RunContext;
use crate::deploy::convergence::ConvergenceOutcome;
use crate::deploy::prompt::Prompter;
use crate::deploy::rotation::{RotationOptions, SeamlessRotation};
use crate::deploy::scheduler::order_by_priority;
use crate::deploy::seed_gate::provision_node;
use crate::errors::RolloutError;
use crate::fleet::{Backend, Deployment, DeployerSpec, NodeDeployer};
use crate::models::environment::{EnvironmentConfig, NodeConf};
use crate::models::generation::{AwsType, Generation};
use crate::storage::environments::ConfigurationManager;
use crate::telemetry::{Timer, TimingEntry};

const ACTION: &str = "up";

/// Parse the generation an up run may target. The old generation is only
/// ever decommissioned, never deployed to.
pub fn parse_target_generation(value: &str) -> Result<Generation, String> {
    match value.parse::<Generation>()? {
        Generation::Old => Err("Cannot deploy to the old generation".to_string()),
        generation => Ok(generation),
    }
}

/// Outcome of an up run
#[derive(Debug, Clone, Serialize)]
pub struct UpReport {
    /// RDS nodes configured
    pub rds_deployed: usize,

    /// EC2 nodes deployed, in deployment order
    pub ec2_order: Vec<String>,

    /// EC2 nodes the operator left non-operational
    pub ignored: Vec<String>,

    pub timings: Vec<TimingEntry>,
}

impl UpReport {
    /// Human readable summary
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Deployed {} RDS node(s) and {} EC2 node(s)",
            self.rds_deployed,
            self.ec2_order.len()
        );
        if !self.ignored.is_empty() {
            summary.push_str(&format!(
                ", left non-operational: {}",
                self.ignored.join(", ")
            ));
        }
        summary
    }
}

/// Collaborators of an up run
pub struct Up<'a> {
    pub ctx: &'a RunContext,
    pub configuration: &'a dyn ConfigurationManager,
    pub backend: &'a dyn Backend,
    pub prompter: &'a dyn Prompter,
    pub notifier: &'a dyn Notifier,
}

/// Deployers of one run, RDS first
struct Deployers {
    rds: Vec<Arc<dyn NodeDeployer>>,
    ec2: Vec<Arc<dyn NodeDeployer>>,
}

impl<'a> Up<'a> {
    /// Make sure the nodes of the target generation exist and run current
    /// configuration
    pub async fn run(&self) -> Result<UpReport, RolloutError> {
        let started = Instant::now();
        let ctx = self.ctx;
        if ctx.generation == Generation::Old {
            return Err(RolloutError::ConfigError(format!(
                "Cannot deploy to the old generation of {}",
                ctx.environment
            )));
        }
        let mut timer = Timer::new();
        self.notifier
            .announce(ctx, &Announcement::Started { action: ACTION });

        info!(run_id = %ctx.run_id, "Gathering deployment state");
        let phase = Instant::now();
        let environment_config = self
            .configuration
            .get_environment_config(&ctx.environment)?;
        let deployment = self
            .backend
            .deployment(&ctx.environment, &environment_config)?;
        // Old nodes are never touched here, only verify pending and active
        deployment.verify_deployment_state(false).await?;
        timer.record("gather deployment state", phase.elapsed());

        info!("Gathering seed deployment state");
        let seed_deployment = timer
            .time("seed_deployment_state", self.seed_deployment())
            .await?;

        info!("Building Node deployers");
        let phase = Instant::now();
        let deployers = self.build_deployers(&environment_config, &deployment, &seed_deployment)?;
        timer.record("build deployers", phase.elapsed());

        let phase = Instant::now();
        info!("Provisioning RDS nodes");
        self.provision(&deployers.rds).await?;
        info!("Provisioning EC2 nodes");
        self.provision(&deployers.ec2).await?;
        timer.record("initial provision", phase.elapsed());

        info!("Configuring RDS nodes");
        timer
            .time("deploy rds", async {
                for deployer in &deployers.rds {
                    deployer.run().await?;
                }
                Ok::<_, RolloutError>(())
            })
            .await?;

        info!("Determining EC2 node deploy priority");
        let ec2_deployers = order_by_priority(deployers.ec2).await?;

        info!("Deploying to EC2 nodes");
        let mut ec2_order = Vec::with_capacity(ec2_deployers.len());
        let mut ignored = Vec::new();
        for deployer in &ec2_deployers {
            let full = Instant::now();
            let outcome = self.deploy_ec2(deployer.as_ref(), &mut timer).await?;
            timer.record(
                format!("full {} deploy", deployer.node_name()),
                full.elapsed(),
            );

            ec2_order.push(deployer.node_name().to_string());
            if outcome == Some(ConvergenceOutcome::Ignored) {
                ignored.push(deployer.node_name().to_string());
            }
        }

        self.notifier.announce(
            ctx,
            &Announcement::Finished {
                action: ACTION,
                duration: started.elapsed(),
            },
        );
        timer.log_breakdown();

        let report = UpReport {
            rds_deployed: deployers.rds.len(),
            ec2_order,
            ignored,
            timings: timer.breakdown(),
        };
        info!("{}", report.summary());
        Ok(report)
    }

    async fn seed_deployment(&self) -> Result<Option<Arc<dyn Deployment>>, RolloutError> {
        let Some(seed_name) = self
            .configuration
            .get_seed_environment_name(&self.ctx.environment)?
        else {
            return Ok(None);
        };

        let seed_config = self.configuration.get_environment_config(&seed_name)?;
        let seed_deployment = self.backend.deployment(&seed_name, &seed_config)?;
        info!("Verifying seed deployment state");
        seed_deployment.verify_deployment_state(false).await?;
        Ok(Some(seed_deployment))
    }

    fn build_deployers(
        &self,
        environment_config: &EnvironmentConfig,
        deployment: &Arc<dyn Deployment>,
        seed_deployment: &Option<Arc<dyn Deployment>>,
    ) -> Result<Deployers, RolloutError> {
        let mut deployers = Deployers {
            rds: Vec::new(),
            ec2: Vec::new(),
        };

        let node_confs = [
            (AwsType::Rds, &environment_config.rds),
            (AwsType::Ec2, &environment_config.ec2),
        ];
        for (aws_type, confs) in node_confs {
            for (node_name, conf) in confs {
                let spec = self.deployer_spec(aws_type, node_name, conf, deployment, seed_deployment);
                let deployer = self.backend.deployer(spec)?;
                match aws_type {
                    AwsType::Rds => deployers.rds.push(deployer),
                    AwsType::Ec2 => deployers.ec2.push(deployer),
                }
            }
        }

        Ok(deployers)
    }

    fn deployer_spec(
        &self,
        aws_type: AwsType,
        node_name: &str,
        conf: &NodeConf,
        deployment: &Arc<dyn Deployment>,
        seed_deployment: &Option<Arc<dyn Deployment>>,
    ) -> DeployerSpec {
        let (seed_node_name, seed_verification) = match (seed_deployment, &conf.seed) {
            (Some(_), Some(seed)) => (Some(seed.unique_id.clone()), seed.verify),
            _ => {
                info!("No seed node configured for {}", node_name);
                (None, false)
            }
        };

        DeployerSpec {
            deployment: deployment.clone(),
            seed_deployment: seed_node_name.as_ref().and(seed_deployment.clone()),
            generation: self.ctx.generation,
            aws_type,
            node_name: node_name.to_string(),
            seed_node_name,
            seed_verification,
            conf: conf.clone(),
        }
    }

    async fn provision(&self, deployers: &[Arc<dyn NodeDeployer>]) -> Result<(), RolloutError> {
        for deployer in deployers {
            provision_node(self.ctx, self.prompter, deployer.as_ref()).await?;
        }
        Ok(())
    }

    async fn deploy_ec2(
        &self,
        deployer: &dyn NodeDeployer,
        timer: &mut Timer,
    ) -> Result<Option<ConvergenceOutcome>, RolloutError> {
        let node = deployer.get_node().await?;
        let deployment = deployer.deployment();
        let rotation = SeamlessRotation::new(self.ctx, self.prompter, deployment.as_ref());
        let options = RotationOptions {
            force_seamless: self.ctx.is_active(),
            make_operational_if_not_already: self.ctx.make_operational,
        };

        let timer_name = format!("{} deploy", deployer.node_name());
        let (elapsed, restored) = rotation
            .run(node, options, move || async move {
                let started = Instant::now();
                deployer.run().await?;
                Ok::<_, RolloutError>(started.elapsed())
            })
            .await?;
        info!("{} took {}s", timer_name, elapsed.as_secs());
        timer.record(timer_name, elapsed);

        Ok(restored)
    }
}
