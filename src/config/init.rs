// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates palette.yml template files.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config, EnvValue};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"marathon_url:
{}
marathon_lb_url:
{}
# Per-application deadline for the whole rollout
timeout: {}
deployment_poll_interval: {}
cutover_poll_interval: {}
# Alternate ports are probed from the scheduler's local port range unless set here
# port_range:
#   min: 10000
#   max: 10100
max_port_probes: {}
# strategy: bluegreen
"#,
        env_value_yaml(&config.marathon_url),
        config
            .marathon_lb_url
            .as_ref()
            .map(env_value_yaml)
            .unwrap_or_default(),
        format_duration(config.timeout),
        format_duration(config.deployment_poll_interval),
        format_duration(config.cutover_poll_interval),
        config.max_port_probes,
    )
}

/// Render whole minutes as `15m`, anything else in seconds.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

fn env_value_yaml(value: &EnvValue) -> String {
    match value {
        EnvValue::Literal(s) => format!("  {s}"),
        EnvValue::FromEnv { var, default } => match default {
            Some(default) => format!("  env: {var}\n  default: {default}"),
            None => format!("  env: {var}"),
        },
    }
}
