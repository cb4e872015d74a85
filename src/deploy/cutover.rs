// ABOUTME: Waits until the load balancer routes all traffic to the new stack and none to the old.
// ABOUTME: Decisions must hold on every replica; reloads and transient stats errors read as not ready.

use std::time::{Duration, Instant};

use crate::balancer::{ApplicationStats, LoadBalancerClient, parse_stats};
use crate::clock::Clock;
use crate::http::ClientError;
use crate::scheduler::SchedulerClient;
use crate::types::AppId;

/// Inputs of one cutover wait.
#[derive(Debug, Clone)]
pub struct CutoverWaitContext {
    pub old_app_id: AppId,
    pub new_app_id: AppId,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverOutcome {
    Complete,
    /// The deadline passed first. The caller owns rollback.
    TimedOut,
}

pub struct CutoverWaiter<'a> {
    scheduler: &'a dyn SchedulerClient,
    balancer: &'a dyn LoadBalancerClient,
    clock: &'a dyn Clock,
    poll_interval: Duration,
}

impl<'a> CutoverWaiter<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        balancer: &'a dyn LoadBalancerClient,
        clock: &'a dyn Clock,
        poll_interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            balancer,
            clock,
            poll_interval,
        }
    }

    /// One readiness decision. Scheduler errors propagate; load balancer
    /// trouble only postpones the decision.
    pub async fn check(&self, ctx: &CutoverWaitContext) -> Result<bool, ClientError> {
        match self.balancer.is_reloading().await {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!("waiting for Marathon-LB to settle (reload detected)");
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!("could not check Marathon-LB reload state: {}", e);
                return Ok(false);
            }
        }

        let new_app = self.scheduler.get_application(&ctx.new_app_id).await?;
        let old_app = self.scheduler.get_application(&ctx.old_app_id).await?;

        let raw = match self.balancer.fetch_stats().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("could not fetch Marathon-LB stats: {}", e);
                return Ok(false);
            }
        };
        let listeners = match parse_stats(&raw) {
            Ok(listeners) => listeners,
            Err(e) => {
                tracing::warn!("could not parse Marathon-LB stats: {}", e);
                return Ok(false);
            }
        };
        let replicas = match self.balancer.instance_count().await {
            Ok(replicas) => replicas,
            Err(e) => {
                tracing::warn!("could not count Marathon-LB replicas: {}", e);
                return Ok(false);
            }
        };

        // Both stacks share the proxy named after the new app's group and port.
        let stats = ApplicationStats::new(&new_app.definition, &listeners);
        if !stats.new_app_is_up(&new_app, replicas) {
            tracing::info!("waiting for {} to come up", ctx.new_app_id);
            return Ok(false);
        }
        if !stats.old_app_is_drained(&old_app, replicas) {
            tracing::info!("waiting for traffic to drain from {}", ctx.old_app_id);
            return Ok(false);
        }
        Ok(true)
    }

    /// Check until cutover completes or the deadline passes.
    pub async fn wait(&self, ctx: &CutoverWaitContext) -> Result<CutoverOutcome, ClientError> {
        tracing::info!(
            "waiting for traffic to cut over from {} to {}",
            ctx.old_app_id,
            ctx.new_app_id
        );

        loop {
            if self.check(ctx).await? {
                tracing::info!("traffic routed to {}", ctx.new_app_id);
                return Ok(CutoverOutcome::Complete);
            }
            if self.clock.now() >= ctx.deadline {
                return Ok(CutoverOutcome::TimedOut);
            }
            self.clock.sleep(self.poll_interval).await;
        }
    }
}
