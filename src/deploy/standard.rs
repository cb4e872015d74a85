// ABOUTME: Standard strategy: submit definitions as they are and wait for the scheduler.
// ABOUTME: No color allocation, no load balancer cutover, no rollback.

use crate::clock::Clock;
use crate::scheduler::{DeploymentHandle, SchedulerClient};
use crate::types::AppDefinition;

use super::error::{DeployError, FailureCause};
use super::monitor::{MonitorOutcome, SchedulerDeploymentMonitor};
use super::settings::DeploySettings;

pub struct StandardDeployment<'a> {
    scheduler: &'a dyn SchedulerClient,
    clock: &'a dyn Clock,
    settings: DeploySettings,
}

impl<'a> StandardDeployment<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        clock: &'a dyn Clock,
        settings: DeploySettings,
    ) -> Self {
        Self {
            scheduler,
            clock,
            settings,
        }
    }

    /// Submit every definition, then wait for each rollout within one
    /// shared deadline.
    pub async fn execute(
        &self,
        apps: &[AppDefinition],
        force: bool,
    ) -> Result<Vec<DeploymentHandle>, DeployError> {
        let deadline = self.clock.now() + self.settings.timeout;

        let mut handles = Vec::with_capacity(apps.len());
        for app in apps {
            tracing::info!("deploying {}", app.id);
            handles.push(self.scheduler.submit(app, force).await?);
        }

        for handle in &handles {
            let monitor = SchedulerDeploymentMonitor::new(self.scheduler, self.clock, handle.clone());
            let outcome = monitor
                .wait(
                    self.clock.remaining(deadline),
                    self.settings.deployment_poll_interval,
                )
                .await?;

            let cause = match outcome {
                MonitorOutcome::Completed => {
                    tracing::info!("{} deployed", handle.application_id);
                    continue;
                }
                MonitorOutcome::Failed(reason) => FailureCause::SchedulerFailed(reason),
                MonitorOutcome::TimedOut { waited } => FailureCause::SchedulerTimeout(waited),
            };
            return Err(DeployError::DeploymentFailed {
                app_id: handle.application_id.clone(),
                cause,
                manual_cleanup: None,
            });
        }

        Ok(handles)
    }
}
