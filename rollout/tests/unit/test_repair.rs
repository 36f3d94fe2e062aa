//! Repair action tests

use rollout::actions::notify::Announcement;
use rollout::actions::repair::repair;
use rollout::deploy::prompt::ScriptedPrompter;
use rollout::errors::RolloutError;

use crate::fakes::{test_ctx, FakeDeployment, RecordingNotifier};

#[tokio::test]
async fn test_nothing_to_repair() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let notifier = RecordingNotifier::default();
    let deployment = FakeDeployment::new("production");

    let report = repair(&ctx, &deployment, &prompter, &notifier, false)
        .await
        .unwrap();

    assert!(report.activated.is_empty());
    assert!(!report.degraded);
    assert_eq!(report.summary(), "No nodes modified");
    assert_eq!(deployment.verified_old(), vec![true]);
}

#[tokio::test]
async fn test_two_nodes_repaired() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::default();
    let notifier = RecordingNotifier::default();
    let deployment = FakeDeployment::new("production")
        .with_repairs(vec![vec!["web-1", "web-2"]])
        .operational_after(Some(1));

    let report = repair(&ctx, &deployment, &prompter, &notifier, true)
        .await
        .unwrap();

    assert_eq!(report.activated, vec!["web-1", "web-2"]);
    assert_eq!(report.summary(), "Succesfully made 2 node(s) operational");
    assert_eq!(deployment.last_force(), Some(true));

    let announcements = notifier.announcements();
    assert_eq!(announcements.len(), 2);
    assert_eq!(
        announcements[0],
        Announcement::Started { action: "repair" }
    );
    assert!(matches!(
        announcements[1],
        Announcement::Finished { action: "repair", .. }
    ));
}

#[tokio::test]
async fn test_operator_fails_repair() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::new(["F"]);
    let notifier = RecordingNotifier::default();
    let deployment = FakeDeployment::new("production").operational_after(None);

    let result = repair(&ctx, &deployment, &prompter, &notifier, false).await;

    assert!(matches!(result, Err(RolloutError::ConvergenceAborted { .. })));
    // Started only, the run never finished
    assert_eq!(notifier.announcements().len(), 1);
}

#[tokio::test]
async fn test_degraded_repair() {
    let ctx = test_ctx(10);
    let prompter = ScriptedPrompter::new(["I"]);
    let notifier = RecordingNotifier::default();
    let deployment = FakeDeployment::new("production")
        .with_repairs(vec![vec!["web-1"]])
        .operational_after(None);

    let report = repair(&ctx, &deployment, &prompter, &notifier, false)
        .await
        .unwrap();

    assert!(report.degraded);
    assert_eq!(report.summary(), "Succesfully made 1 node(s) operational");
}
