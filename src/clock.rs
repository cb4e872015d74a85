// ABOUTME: Injectable time source for polling loops and deploy timestamps.
// ABOUTME: SystemClock uses tokio timers; tests substitute a manually advanced clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Source of monotonic time, wall-clock time, and sleeps.
///
/// Every wait in the deployment flow goes through a `Clock` so deadlines can be
/// exercised deterministically.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic "now", used for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock "now", used for deployment timestamps.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Time left until `deadline`, zero if it has passed.
    fn remaining(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
