// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Rejects inverted port ranges and zero poll intervals at parse time.

use serde::Deserialize;
use std::time::Duration;

use crate::scheduler::PortRange;

pub fn deserialize_port_range<'de, D>(deserializer: D) -> Result<Option<PortRange>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let range: Option<PortRange> = Option::deserialize(deserializer)?;
    match range {
        Some(r) if r.is_empty() => Err(serde::de::Error::custom(format!(
            "port_range min {} is above max {}",
            r.min, r.max
        ))),
        other => Ok(other),
    }
}

pub fn deserialize_poll_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let interval: Duration = humantime_serde::deserialize(deserializer)?;
    if interval.is_zero() {
        return Err(serde::de::Error::custom(
            "poll interval must be greater than zero",
        ));
    }
    Ok(interval)
}
