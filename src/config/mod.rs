// ABOUTME: Configuration types and parsing for palette.yml.
// ABOUTME: Handles YAML parsing, env var indirection, defaults, and file discovery.

mod deserialize;
mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::deploy::{DEFAULT_MAX_PORT_PROBES, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crate::deploy::{DeploySettings, DeployStrategy};
use crate::error::{Error, Result};
use crate::scheduler::PortRange;
use deserialize::{deserialize_poll_interval, deserialize_port_range};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "palette.yml";
pub const CONFIG_FILENAME_ALT: &str = "palette.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".palette/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Marathon base URL.
    pub marathon_url: EnvValue,

    /// Marathon-LB URL; may resolve to several replicas.
    #[serde(default)]
    pub marathon_lb_url: Option<EnvValue>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_poll_interval"
    )]
    pub deployment_poll_interval: Duration,

    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_poll_interval"
    )]
    pub cutover_poll_interval: Duration,

    #[serde(default, deserialize_with = "deserialize_port_range")]
    pub port_range: Option<PortRange>,

    #[serde(default = "default_max_port_probes")]
    pub max_port_probes: u32,

    #[serde(default)]
    pub strategy: Option<DeployStrategy>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_max_port_probes() -> u32 {
    DEFAULT_MAX_PORT_PROBES
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn marathon_url(&self) -> Result<String> {
        self.marathon_url.resolve()
    }

    /// Required for blue-green deployments only.
    pub fn marathon_lb_url(&self) -> Result<String> {
        self.marathon_lb_url
            .as_ref()
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "marathon_lb_url is required for blue-green deployments".to_string(),
                )
            })?
            .resolve()
    }

    /// Deployment tunables, with `timeout` overridden when given.
    pub fn deploy_settings(&self, timeout: Option<Duration>) -> DeploySettings {
        DeploySettings {
            timeout: timeout.unwrap_or(self.timeout),
            deployment_poll_interval: self.deployment_poll_interval,
            cutover_poll_interval: self.cutover_poll_interval,
            port_range: self.port_range,
            max_port_probes: self.max_port_probes,
        }
    }

    pub fn template() -> Self {
        Config {
            marathon_url: EnvValue::FromEnv {
                var: "MARATHON_URL".to_string(),
                default: Some("http://marathon.mesos:8080".to_string()),
            },
            marathon_lb_url: Some(EnvValue::FromEnv {
                var: "MARATHON_LB_URL".to_string(),
                default: Some("http://marathon-lb.marathon.mesos:9090".to_string()),
            }),
            timeout: default_timeout(),
            deployment_poll_interval: default_poll_interval(),
            cutover_poll_interval: default_poll_interval(),
            port_range: None,
            max_port_probes: default_max_port_probes(),
            strategy: None,
        }
    }
}
