// ABOUTME: Deployment strategy selection from CLI flags and configuration.
// ABOUTME: Chooses between blue-green and standard deployments.

use serde::Deserialize;

/// Strategy for rolling out application definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeployStrategy {
    /// Blue-green deployment: start a new colored stack, wait for the load
    /// balancer to cut traffic over, remove the old stack.
    #[value(name = "bluegreen")]
    BlueGreen,

    /// Standard deployment: let the scheduler replace tasks in place.
    Standard,
}

impl DeployStrategy {
    /// Determine the strategy to use.
    ///
    /// Priority:
    /// 1. Explicit `--strategy` flag
    /// 2. `strategy` in config
    /// 3. Default to blue-green
    pub fn select(flag: Option<Self>, config: Option<Self>) -> Self {
        flag.or(config).unwrap_or(DeployStrategy::BlueGreen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStrategy::BlueGreen => "bluegreen",
            DeployStrategy::Standard => "standard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_blue_green() {
        assert_eq!(DeployStrategy::select(None, None), DeployStrategy::BlueGreen);
    }

    #[test]
    fn config_strategy_applies_without_flag() {
        assert_eq!(
            DeployStrategy::select(None, Some(DeployStrategy::Standard)),
            DeployStrategy::Standard
        );
    }

    #[test]
    fn flag_overrides_config() {
        let selected =
            DeployStrategy::select(Some(DeployStrategy::BlueGreen), Some(DeployStrategy::Standard));
        assert_eq!(selected, DeployStrategy::BlueGreen);
    }

    #[test]
    fn config_spelling() {
        let strategy: DeployStrategy = serde_yaml::from_str("bluegreen").unwrap();
        assert_eq!(strategy, DeployStrategy::BlueGreen);
    }
}
