// ABOUTME: Tests for the standard (in-place) deployment strategy.
// ABOUTME: Definitions go to the scheduler unchanged; failures are reported without rollback.

mod support;

use palette::deploy::{DeployError, DeploySettings, FailureCause, StandardDeployment};
use std::time::Duration;
use support::clock::ManualClock;
use support::scheduler::{FakeScheduler, template};

fn settings() -> DeploySettings {
    DeploySettings {
        timeout: Duration::from_secs(30),
        ..DeploySettings::default()
    }
}

#[tokio::test]
async fn submits_definitions_unchanged() {
    support::init_tracing();
    let scheduler = FakeScheduler::new(Vec::new());
    let clock = ManualClock::new();

    let handles = StandardDeployment::new(&scheduler, &clock, settings())
        .execute(&[template(3)], false)
        .await
        .unwrap();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].application_id.as_str(), "/my-app");
    assert_eq!(scheduler.submitted(), vec![template(3)]);
    assert!(scheduler.deleted().is_empty());
}

#[tokio::test]
async fn unhealthy_rollout_fails_without_cleanup() {
    let scheduler = FakeScheduler::new(Vec::new()).with_unhealthy_tasks(1);
    let clock = ManualClock::new();

    let err = StandardDeployment::new(&scheduler, &clock, settings())
        .execute(&[template(3)], false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::DeploymentFailed {
            cause: FailureCause::SchedulerFailed(_),
            manual_cleanup: None,
            ..
        }
    ));
    assert_eq!(scheduler.app_ids(), vec!["/my-app"]);
}

#[tokio::test]
async fn slow_rollout_times_out() {
    let scheduler = FakeScheduler::new(Vec::new()).with_pending_polls(u32::MAX);
    let clock = ManualClock::new();

    let err = StandardDeployment::new(&scheduler, &clock, settings())
        .execute(&[template(3)], false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::DeploymentFailed {
            cause: FailureCause::SchedulerTimeout(_),
            ..
        }
    ));
    assert_eq!(clock.elapsed(), Duration::from_secs(30));
}

#[tokio::test]
async fn rejected_submission_is_a_scheduler_error() {
    let scheduler = FakeScheduler::new(Vec::new()).rejecting_submissions();
    let clock = ManualClock::new();

    let err = StandardDeployment::new(&scheduler, &clock, settings())
        .execute(&[template(3)], true)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Scheduler(_)));
}
