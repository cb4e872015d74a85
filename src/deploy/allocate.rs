// ABOUTME: Computes the color, id, ports, and tracking labels of the next blue-green stack.
// ABOUTME: Pure: derives a new definition from its inputs without I/O or hidden randomness.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::scheduler::{AppState, PortRange};
use crate::types::{AppDefinition, AppDefinitionError, Color, labels};

use super::error::DeployError;

/// Default bound on random alternate-port probes.
pub const DEFAULT_MAX_PORT_PROBES: u32 = 100;

/// Everything besides the two definitions an allocation depends on.
#[derive(Debug, Clone)]
pub struct AllocationContext<'a> {
    /// Currently deployed apps, whose ports are taken.
    pub cluster_apps: &'a [AppState],
    pub started_at: DateTime<Utc>,
    /// Seed for alternate-port probing.
    pub seed: u64,
}

/// Allocates the identity of the next stack of a deployment group.
#[derive(Debug, Clone)]
pub struct PortColorAllocator {
    port_range: Option<PortRange>,
    max_probes: u32,
}

impl PortColorAllocator {
    pub fn new(port_range: Option<PortRange>, max_probes: u32) -> Self {
        Self {
            port_range,
            max_probes,
        }
    }

    /// Whether allocating for `new_app` requires probing for an alternate
    /// port, and so a known port range.
    pub fn needs_port_probe(new_app: &AppDefinition, old_app: Option<&AppDefinition>) -> bool {
        let declared = |app: &AppDefinition| app.label(labels::ALT_PORT).is_some();
        !declared(new_app) && !old_app.is_some_and(declared)
    }

    /// The service port `new_app` declares but will not get, because a prior
    /// stack already fixes the group's primary/alternate pair.
    pub fn ignored_service_port(
        new_app: &AppDefinition,
        old_app: Option<&AppDefinition>,
    ) -> Option<u16> {
        if new_app.label(labels::PRIMARY_PORT).is_some() {
            return None;
        }
        let old = old_app?;
        let primary = old.port_label(labels::PRIMARY_PORT).ok().flatten()?;
        let alt = old.port_label(labels::ALT_PORT).ok().flatten();
        let declared = new_app.service_port()?;
        (declared != primary && Some(declared) != alt).then_some(declared)
    }

    /// Derive the definition to submit for `new_app`.
    ///
    /// Without a prior stack the new one is blue and listens on its primary
    /// port. With one, the color flips and the new stack takes whichever of
    /// the primary/alternate pair the old stack is not listening on.
    pub fn allocate(
        &self,
        new_app: &AppDefinition,
        old_app: Option<&AppDefinition>,
        ctx: &AllocationContext<'_>,
    ) -> Result<AppDefinition, DeployError> {
        let mut app = new_app.clone();
        let original_id = new_app.id.clone();

        let primary = match new_app.port_label(labels::PRIMARY_PORT)? {
            Some(port) => port,
            None => {
                let inherited = match old_app {
                    Some(old) => old.port_label(labels::PRIMARY_PORT)?,
                    None => None,
                };
                inherited
                    .or_else(|| new_app.service_port())
                    .ok_or_else(|| AppDefinitionError::NoServicePort(original_id.clone()))?
            }
        };

        let alt = match new_app.port_label(labels::ALT_PORT)? {
            Some(port) => port,
            None => match old_app.map(|old| old.port_label(labels::ALT_PORT)).transpose()? {
                Some(Some(port)) => port,
                _ => self.probe_alt_port(primary, ctx)?,
            },
        };

        let (color, active) = match old_app {
            None => (Color::Blue, primary),
            Some(old) => {
                let old_color = old.color()?.ok_or_else(|| AppDefinitionError::MissingLabel {
                    app_id: old.id.clone(),
                    label: labels::DEPLOYMENT_COLOUR,
                })?;
                let active = if old.service_port() == Some(primary) {
                    alt
                } else {
                    primary
                };
                (old_color.flip(), active)
            }
        };

        app.set_service_port(active)?;
        app.id = original_id.with_suffix(color.as_str());
        app.set_label(labels::ORIGINAL_APP_ID, original_id.as_str());
        app.set_label(labels::PRIMARY_PORT, primary.to_string());
        app.set_label(labels::ALT_PORT, alt.to_string());
        app.set_label(labels::DEPLOYMENT_COLOUR, color.as_str());
        app.set_label(
            labels::STARTED_AT,
            ctx.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        app.set_label(labels::TARGET_INSTANCES, app.instances.to_string());

        tracing::debug!("allocated {} on port {} (alt {})", app.id, active, alt);
        Ok(app)
    }

    /// Randomly probe the port range for a port no deployed app uses.
    fn probe_alt_port(
        &self,
        primary: u16,
        ctx: &AllocationContext<'_>,
    ) -> Result<u16, DeployError> {
        let range = self.port_range.ok_or(DeployError::NoPortRange)?;
        if range.is_empty() || self.max_probes == 0 {
            return Err(DeployError::PortRangeExhausted {
                range,
                attempts: 0,
            });
        }

        let taken = used_ports(ctx.cluster_apps);
        let mut rng = StdRng::seed_from_u64(ctx.seed);
        for _ in 0..self.max_probes {
            let candidate = rng.gen_range(range.min..=range.max);
            if candidate != primary && !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }

        Err(DeployError::PortRangeExhausted {
            range,
            attempts: self.max_probes,
        })
    }
}

/// Ports deployed apps listen on or hold in reserve.
fn used_ports(apps: &[AppState]) -> BTreeSet<u16> {
    let mut ports = BTreeSet::new();
    for app in apps {
        let definition = &app.definition;
        ports.extend(definition.service_port());
        for key in [labels::PRIMARY_PORT, labels::ALT_PORT] {
            if let Ok(Some(port)) = definition.port_label(key) {
                ports.insert(port);
            }
        }
    }
    ports
}
