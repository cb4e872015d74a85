// ABOUTME: Load balancer layer: stats parsing, per-application listener matching, and the client seam.
// ABOUTME: The cutover check talks to Marathon-LB only through LoadBalancerClient.

mod application;
mod marathon_lb;
mod stats;

pub use application::{ApplicationStats, proxy_name, task_service_name};
pub use marathon_lb::MarathonLb;
pub use stats::{Listener, ListenerStatus, StatsError, parse_instance_stats, parse_stats};

use crate::http::ClientError;
use async_trait::async_trait;

/// Operations the deployment flow needs from a replicated load balancer.
#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    /// Raw CSV stats, one entry per replica.
    async fn fetch_stats(&self) -> Result<Vec<String>, ClientError>;

    /// Whether any replica is mid-reload.
    async fn is_reloading(&self) -> Result<bool, ClientError>;

    /// Number of replicas behind the configured address.
    async fn instance_count(&self) -> Result<usize, ClientError>;
}
