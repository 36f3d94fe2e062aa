//! Seamless rotation tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rollout::deploy::convergence::ConvergenceOutcome;
use rollout::deploy::prompt::ScriptedPrompter;
use rollout::deploy::rotation::{RotationOptions, SeamlessRotation};
use rollout::errors::RolloutError;
use rollout::fleet::Node;

use crate::fakes::{test_ctx, FakeDeployment, FakeNode};

fn seamless() -> RotationOptions {
    RotationOptions {
        force_seamless: true,
        make_operational_if_not_already: false,
    }
}

#[tokio::test]
async fn test_non_interactive_without_redundancy_never_mutates() {
    let ctx = test_ctx(10).with_interactive(false);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging").with_redundancy(false);
    let node = FakeNode::new("web-1", true, true);
    let mutated = AtomicBool::new(false);
    let flag = &mutated;

    let result = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, RolloutError>(())
        })
        .await;

    assert!(matches!(
        result,
        Err(RolloutError::UnsafeRotation { ref node }) if node == "web-1"
    ));
    assert!(!mutated.load(Ordering::SeqCst));
    assert_eq!(node.inoperative_calls(), 0);
    assert!(node.operational());
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn test_operator_refuses_interruption() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::new(["y"]);
    let deployment = FakeDeployment::new("staging").with_redundancy(false);
    let node = FakeNode::new("web-1", true, true);

    let result = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Ok::<_, RolloutError>(())
        })
        .await;

    // Only an exact "Y" agrees
    assert!(matches!(result, Err(RolloutError::UnsafeRotation { .. })));
    assert_eq!(
        prompter.asked(),
        vec!["\n\nNot possible to avoid service interruption to node web-1. Continue anyway? (Y/N)"]
    );
    assert!(node.operational());
}

#[tokio::test]
async fn test_operator_accepts_interruption() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::new(["Y"]);
    let deployment = FakeDeployment::new("staging").with_redundancy(false);
    let node = FakeNode::new("web-1", true, true);

    let (_, restored) = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Ok::<_, RolloutError>(())
        })
        .await
        .unwrap();

    assert_eq!(restored, Some(ConvergenceOutcome::Operational));
    assert!(node.operational());
}

#[tokio::test]
async fn test_node_is_out_of_service_during_mutation() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging");
    let node = FakeNode::new("web-1", true, true);
    let watched = node.clone();

    let (seen_operational, restored) = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Ok::<_, RolloutError>(watched.operational())
        })
        .await
        .unwrap();

    assert!(!seen_operational);
    assert_eq!(restored, Some(ConvergenceOutcome::Operational));
    assert!(node.operational());
    assert_eq!(node.inoperative_calls(), 1);
    assert_eq!(deployment.redundancy_checks(), 1);
}

#[tokio::test]
async fn test_failed_mutation_still_restores() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging");
    let node = FakeNode::new("web-1", true, true);

    let result = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Err::<(), _>(RolloutError::CollaboratorError("configuration failed".into()))
        })
        .await;

    assert!(matches!(result, Err(RolloutError::CollaboratorError(_))));
    assert!(node.operational());
    assert_eq!(node.make_operational_calls(), 1);
}

#[tokio::test]
async fn test_restore_abort_wins_over_mutation_error() {
    let ctx = test_ctx(0);
    let prompter = ScriptedPrompter::new(["F"]);
    let deployment = FakeDeployment::new("staging");
    let node = FakeNode::coming_up_on("web-1", true, true, None);

    let result = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Err::<(), _>(RolloutError::CollaboratorError("configuration failed".into()))
        })
        .await;

    assert!(matches!(result, Err(RolloutError::ConvergenceAborted { .. })));
}

#[tokio::test]
async fn test_inoperative_node_left_alone() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging");
    let node = FakeNode::new("web-1", false, true);

    let (_, restored) = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), seamless(), move || async move {
            Ok::<_, RolloutError>(())
        })
        .await
        .unwrap();

    assert_eq!(restored, None);
    assert_eq!(node.inoperative_calls(), 0);
    assert_eq!(node.make_operational_calls(), 0);
    assert!(!node.operational());
}

#[tokio::test]
async fn test_inoperative_node_brought_up_on_request() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging");
    let node = FakeNode::new("web-1", false, true);
    let options = RotationOptions {
        force_seamless: true,
        make_operational_if_not_already: true,
    };

    let (_, restored) = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), options, move || async move { Ok::<_, RolloutError>(()) })
        .await
        .unwrap();

    assert_eq!(restored, Some(ConvergenceOutcome::Operational));
    assert!(node.operational());
}

#[tokio::test]
async fn test_new_node_restored_through_generation_repair() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging")
        .with_repairs(vec![vec!["web-1"]])
        .operational_after(Some(1));
    let options = RotationOptions {
        force_seamless: true,
        make_operational_if_not_already: true,
    };

    let rotation = SeamlessRotation::new(&ctx, &prompter, &deployment);
    let plan = rotation.prepare(None, options).await.unwrap();
    assert!(plan.restores());
    assert!(!plan.pulled());

    let restored = rotation.restore(plan).await.unwrap();
    assert_eq!(restored, Some(ConvergenceOutcome::Operational));
    assert_eq!(deployment.last_force(), Some(true));
    assert_eq!(deployment.redundancy_checks(), 0);
}

#[tokio::test]
async fn test_redundancy_not_checked_without_force_seamless() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let deployment = FakeDeployment::new("staging").with_redundancy(false);
    let node = FakeNode::new("web-1", true, true);
    let options = RotationOptions {
        force_seamless: false,
        make_operational_if_not_already: false,
    };

    let (_, restored) = SeamlessRotation::new(&ctx, &prompter, &deployment)
        .run(Some(node.clone() as Arc<dyn Node>), options, move || async move { Ok::<_, RolloutError>(()) })
        .await
        .unwrap();

    assert_eq!(deployment.redundancy_checks(), 0);
    assert_eq!(restored, Some(ConvergenceOutcome::Operational));
}
