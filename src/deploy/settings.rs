// ABOUTME: Tunables shared by the deployment strategies.
// ABOUTME: Built from configuration and CLI flags by the deploy command.

use std::time::Duration;

use crate::scheduler::PortRange;

use super::allocate::DEFAULT_MAX_PORT_PROBES;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    /// Per-application deadline, covering both the scheduler and cutover waits.
    pub timeout: Duration,
    pub deployment_poll_interval: Duration,
    pub cutover_poll_interval: Duration,
    /// Overrides the scheduler's reported local port range.
    pub port_range: Option<PortRange>,
    pub max_port_probes: u32,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            deployment_poll_interval: DEFAULT_POLL_INTERVAL,
            cutover_poll_interval: DEFAULT_POLL_INTERVAL,
            port_range: None,
            max_port_probes: DEFAULT_MAX_PORT_PROBES,
        }
    }
}
