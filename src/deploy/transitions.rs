// ABOUTME: State transition methods for blue-green deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::time::Duration;

use crate::balancer::LoadBalancerClient;
use crate::clock::Clock;
use crate::scheduler::SchedulerClient;
use crate::types::AppDefinition;

use super::Deployment;
use super::cutover::{CutoverOutcome, CutoverWaitContext, CutoverWaiter};
use super::error::{DeployError, FailureCause};
use super::monitor::{MonitorOutcome, SchedulerDeploymentMonitor};
use super::state::{Completed, CutOver, Deployed, Prepared, Submitted};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, FailureCause)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            app: self.app,
            old_app: self.old_app,
            deadline: self.deadline,
            state,
        }
    }

    /// Internal helper for rollback - deletes the new stack.
    ///
    /// Always yields `DeploymentFailed`. If the delete itself fails the new
    /// stack is named for manual cleanup.
    async fn rollback_new_stack(
        self,
        scheduler: &dyn SchedulerClient,
        cause: FailureCause,
    ) -> DeployError {
        let app_id = self.app.id;
        tracing::warn!("rolling back {}: {}", app_id, cause);

        let manual_cleanup = match scheduler.delete_application(&app_id).await {
            Ok(true) => {
                tracing::info!("removed {}", app_id);
                None
            }
            Ok(false) => {
                tracing::error!(
                    "scheduler refused to remove {}, manual intervention required",
                    app_id
                );
                Some(app_id.clone())
            }
            Err(e) => {
                tracing::error!(
                    "failed to remove {}: {}, manual intervention required",
                    app_id,
                    e
                );
                Some(app_id.clone())
            }
        };

        DeployError::DeploymentFailed {
            app_id,
            cause,
            manual_cleanup,
        }
    }
}

// =============================================================================
// Prepared -> Submitted
// =============================================================================

impl Deployment<Prepared> {
    /// Submit the new stack to the scheduler.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Scheduler` if the scheduler rejects the
    /// submission (for example a 409 while another deployment holds the app).
    /// Nothing was created, so there is nothing to roll back.
    #[must_use = "deployment state must be used"]
    pub async fn submit(
        self,
        scheduler: &dyn SchedulerClient,
        force: bool,
    ) -> Result<Deployment<Submitted>, DeployError> {
        let handle = scheduler.submit(&self.app, force).await?;
        Ok(self.transition(Submitted { handle }))
    }
}

// =============================================================================
// Submitted -> Deployed
// =============================================================================

impl Deployment<Submitted> {
    /// Wait for the scheduler to finish rolling out the new stack.
    ///
    /// # Errors
    ///
    /// Returns `(self, cause)` on failure to allow rollback.
    #[must_use = "deployment state must be used"]
    pub async fn await_scheduler(
        self,
        scheduler: &dyn SchedulerClient,
        clock: &dyn Clock,
        poll_interval: Duration,
    ) -> TransitionResult<Deployed, Submitted> {
        let timeout = clock.remaining(self.deadline);
        let monitor = SchedulerDeploymentMonitor::new(scheduler, clock, self.state.handle.clone());

        match monitor.wait(timeout, poll_interval).await {
            Ok(MonitorOutcome::Completed) => Ok(self.transition(Deployed)),
            Ok(MonitorOutcome::Failed(reason)) => Err((self, FailureCause::SchedulerFailed(reason))),
            Ok(MonitorOutcome::TimedOut { waited }) => {
                Err((self, FailureCause::SchedulerTimeout(waited)))
            }
            Err(e) => Err((self, FailureCause::SchedulerUnavailable(e.to_string()))),
        }
    }

    /// Rollback: delete the new stack.
    pub async fn rollback(
        self,
        scheduler: &dyn SchedulerClient,
        cause: FailureCause,
    ) -> DeployError {
        self.rollback_new_stack(scheduler, cause).await
    }
}

// =============================================================================
// Deployed -> CutOver
// =============================================================================

impl Deployment<Deployed> {
    /// Wait until the load balancer routes all traffic to the new stack and
    /// none to the old one. Immediate when no stack is being replaced.
    ///
    /// # Errors
    ///
    /// Returns `(self, cause)` on failure to allow rollback.
    #[must_use = "deployment state must be used"]
    pub async fn await_cutover(
        self,
        scheduler: &dyn SchedulerClient,
        balancer: &dyn LoadBalancerClient,
        clock: &dyn Clock,
        poll_interval: Duration,
    ) -> TransitionResult<CutOver, Deployed> {
        let Some(old_app_id) = self.old_app.clone() else {
            return Ok(self.transition(CutOver));
        };

        let ctx = CutoverWaitContext {
            old_app_id,
            new_app_id: self.app.id.clone(),
            deadline: self.deadline,
        };
        let waiter = CutoverWaiter::new(scheduler, balancer, clock, poll_interval);

        match waiter.wait(&ctx).await {
            Ok(CutoverOutcome::Complete) => Ok(self.transition(CutOver)),
            Ok(CutoverOutcome::TimedOut) => Err((self, FailureCause::SwapTimeout)),
            Err(e) => Err((self, FailureCause::SchedulerUnavailable(e.to_string()))),
        }
    }

    /// Rollback: delete the new stack.
    pub async fn rollback(
        self,
        scheduler: &dyn SchedulerClient,
        cause: FailureCause,
    ) -> DeployError {
        self.rollback_new_stack(scheduler, cause).await
    }
}

// =============================================================================
// CutOver -> Completed
// =============================================================================

impl Deployment<CutOver> {
    /// Delete the replaced stack, if any.
    ///
    /// # Errors
    ///
    /// Traffic has already moved, so a failed delete is not rolled back. It
    /// is reported as `DeploymentFailed` naming the old stack for cleanup.
    #[must_use = "deployment state must be used"]
    pub async fn retire_old(
        self,
        scheduler: &dyn SchedulerClient,
    ) -> Result<Deployment<Completed>, DeployError> {
        let Some(old_app_id) = self.old_app.clone() else {
            return Ok(self.transition(Completed));
        };

        let removed = match scheduler.delete_application(&old_app_id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!("failed to remove {}: {}", old_app_id, e);
                false
            }
        };
        if !removed {
            tracing::error!(
                "{} still exists after cutover, manual intervention required",
                old_app_id
            );
            return Err(DeployError::DeploymentFailed {
                app_id: self.app.id,
                cause: FailureCause::OldStackNotRemoved(old_app_id.clone()),
                manual_cleanup: Some(old_app_id),
            });
        }

        tracing::info!("removed {}", old_app_id);
        Ok(self.transition(Completed))
    }
}

// =============================================================================
// Completed - Terminal State
// =============================================================================

impl Deployment<Completed> {
    /// The definition now serving traffic.
    pub fn deployed_app(&self) -> &AppDefinition {
        &self.app
    }

    /// Consume the deployment and return the deployed definition.
    pub fn finish(self) -> AppDefinition {
        self.app
    }
}
