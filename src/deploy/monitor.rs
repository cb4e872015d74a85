// ABOUTME: Turns an asynchronous scheduler submission into an explicit outcome by polling.
// ABOUTME: Detects completion, version mismatches, unhealthy tasks, and timeouts.

use std::time::Duration;

use crate::clock::Clock;
use crate::http::ClientError;
use crate::scheduler::{AppState, DeploymentHandle, SchedulerClient};

/// Why the scheduler considers a finished deployment failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// Another actor deployed concurrently, or the scheduler rolled back.
    #[error("expected version {expected}, scheduler reports {observed}")]
    VersionMismatch { expected: String, observed: String },

    #[error("{0} task(s) unhealthy")]
    TasksUnhealthy(u32),
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStatus {
    InProgress,
    Completed,
    Failed(FailureReason),
}

/// Result of waiting for a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Completed,
    Failed(FailureReason),
    TimedOut { waited: Duration },
}

/// Classify the app's state against the submission that produced it.
pub fn deployment_status(handle: &DeploymentHandle, app: &AppState) -> DeploymentStatus {
    if app.is_deploying(&handle.deployment_id) {
        return DeploymentStatus::InProgress;
    }
    if app.version != handle.expected_version {
        return DeploymentStatus::Failed(FailureReason::VersionMismatch {
            expected: handle.expected_version.clone(),
            observed: app.version.clone(),
        });
    }
    if app.tasks_unhealthy > 0 {
        return DeploymentStatus::Failed(FailureReason::TasksUnhealthy(app.tasks_unhealthy));
    }
    DeploymentStatus::Completed
}

/// Polls the scheduler for one submitted deployment.
pub struct SchedulerDeploymentMonitor<'a> {
    scheduler: &'a dyn SchedulerClient,
    clock: &'a dyn Clock,
    handle: DeploymentHandle,
}

impl<'a> SchedulerDeploymentMonitor<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        clock: &'a dyn Clock,
        handle: DeploymentHandle,
    ) -> Self {
        Self {
            scheduler,
            clock,
            handle,
        }
    }

    pub async fn check(&self) -> Result<DeploymentStatus, ClientError> {
        let app = self
            .scheduler
            .get_application(&self.handle.application_id)
            .await?;
        Ok(deployment_status(&self.handle, &app))
    }

    /// Sleep, check, repeat until the deployment settles or `timeout` has
    /// elapsed since the call started.
    pub async fn wait(
        self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<MonitorOutcome, ClientError> {
        let started = self.clock.now();
        tracing::info!(
            "waiting for deployment {} of {}",
            self.handle.deployment_id,
            self.handle.application_id
        );

        loop {
            self.clock.sleep(poll_interval).await;

            match self.check().await? {
                DeploymentStatus::Completed => return Ok(MonitorOutcome::Completed),
                DeploymentStatus::Failed(reason) => return Ok(MonitorOutcome::Failed(reason)),
                DeploymentStatus::InProgress => {}
            }

            let waited = self.clock.now().saturating_duration_since(started);
            if waited >= timeout {
                return Ok(MonitorOutcome::TimedOut { waited });
            }
            tracing::debug!(
                "deployment {} still in progress after {}s",
                self.handle.deployment_id,
                waited.as_secs()
            );
        }
    }
}
