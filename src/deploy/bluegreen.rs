// ABOUTME: Blue-green orchestration: validate, allocate, submit, wait, cut over, retire.
// ABOUTME: Applications are deployed one at a time; failures roll back the new stack only.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::balancer::LoadBalancerClient;
use crate::clock::Clock;
use crate::scheduler::{AppState, PortRange, SchedulerClient};
use crate::types::{AppDefinition, AppId, labels};

use super::allocate::{AllocationContext, PortColorAllocator};
use super::deployment::Deployment;
use super::error::DeployError;
use super::settings::DeploySettings;
use super::validate::{PreflightValidator, stacks_in_group};

/// An allocated definition ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedApp {
    pub app: AppDefinition,
    /// The stack the new one replaces.
    pub previous: Option<AppId>,
    /// A service port the template declares that the group's existing
    /// primary/alternate pair overrides.
    pub ignored_service_port: Option<u16>,
}

/// Blue-green deployment of a set of application definitions.
pub struct BlueGreenDeployment<'a> {
    scheduler: &'a dyn SchedulerClient,
    balancer: &'a dyn LoadBalancerClient,
    clock: &'a dyn Clock,
    settings: DeploySettings,
}

impl<'a> BlueGreenDeployment<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        balancer: &'a dyn LoadBalancerClient,
        clock: &'a dyn Clock,
        settings: DeploySettings,
    ) -> Self {
        Self {
            scheduler,
            balancer,
            clock,
            settings,
        }
    }

    /// Deploy each definition in turn, stopping at the first failure.
    ///
    /// Each one is prepared against the cluster as left by the previous.
    pub async fn execute(
        &self,
        templates: &[AppDefinition],
        force: bool,
    ) -> Result<Vec<AppDefinition>, DeployError> {
        let mut deployed = Vec::with_capacity(templates.len());
        for template in templates {
            deployed.push(self.deploy_template(template, force).await?);
        }
        Ok(deployed)
    }

    /// Prepare every definition against the cluster as it is now.
    ///
    /// Nothing is submitted. The result shows what would be deployed; apps
    /// after the first are prepared again by `deploy_template` once the ones
    /// before them are live, so their ports may differ.
    pub async fn preview(
        &self,
        templates: &[AppDefinition],
    ) -> Result<Vec<PreparedApp>, DeployError> {
        let mut prepared = Vec::with_capacity(templates.len());
        for template in templates {
            prepared.push(self.prepare(template).await?);
        }
        Ok(prepared)
    }

    /// Prepare `template` against the current cluster and deploy it.
    pub async fn deploy_template(
        &self,
        template: &AppDefinition,
        force: bool,
    ) -> Result<AppDefinition, DeployError> {
        let prepared = self.prepare(template).await?;
        self.deploy(prepared, force).await
    }

    /// Validate `template` and allocate the identity of its next stack.
    ///
    /// Reads from the scheduler only.
    pub async fn prepare(&self, template: &AppDefinition) -> Result<PreparedApp, DeployError> {
        let cluster = PreflightValidator::new(self.scheduler)
            .validate(template)
            .await?;

        // Present: validation checked the label.
        let group = template.deployment_group().unwrap_or_default();
        let previous = latest_stack(group, &cluster);
        if let Some(previous) = previous {
            tracing::info!("{} replaces {}", template.id, previous.id());
        }

        let previous_definition = previous.map(|p| &p.definition);
        let port_range = self.port_range(template, previous_definition).await?;
        let started_at = self.clock.utc_now();
        let ctx = AllocationContext {
            cluster_apps: &cluster,
            started_at,
            seed: probe_seed(started_at, &template.id),
        };
        let app = PortColorAllocator::new(port_range, self.settings.max_port_probes).allocate(
            template,
            previous_definition,
            &ctx,
        )?;

        Ok(PreparedApp {
            app,
            previous: previous.map(|p| p.id().clone()),
            ignored_service_port: PortColorAllocator::ignored_service_port(
                template,
                previous_definition,
            ),
        })
    }

    /// Run one prepared app through the deployment state machine.
    pub async fn deploy(
        &self,
        prepared: PreparedApp,
        force: bool,
    ) -> Result<AppDefinition, DeployError> {
        if let Some(port) = prepared.ignored_service_port {
            tracing::warn!(
                "{} keeps its group's ports, ignoring declared service port {}",
                prepared.app.id,
                port
            );
        }
        let deadline = self.clock.now() + self.settings.timeout;
        let deployment = Deployment::new(prepared.app, prepared.previous, deadline);
        tracing::info!("deploying {}", deployment.app_id());

        let deployment = deployment.submit(self.scheduler, force).await?;

        let deployment = match deployment
            .await_scheduler(
                self.scheduler,
                self.clock,
                self.settings.deployment_poll_interval,
            )
            .await
        {
            Ok(d) => d,
            Err((failed, cause)) => return Err(failed.rollback(self.scheduler, cause).await),
        };

        let deployment = match deployment
            .await_cutover(
                self.scheduler,
                self.balancer,
                self.clock,
                self.settings.cutover_poll_interval,
            )
            .await
        {
            Ok(d) => d,
            Err((failed, cause)) => return Err(failed.rollback(self.scheduler, cause).await),
        };

        let deployment = deployment.retire_old(self.scheduler).await?;
        tracing::info!("{} deployed", deployment.deployed_app().id);
        Ok(deployment.finish())
    }

    /// The range to probe for an alternate port, asking the scheduler only
    /// when probing is needed and no range is configured.
    async fn port_range(
        &self,
        template: &AppDefinition,
        previous: Option<&AppDefinition>,
    ) -> Result<Option<PortRange>, DeployError> {
        if let Some(range) = self.settings.port_range {
            return Ok(Some(range));
        }
        if !PortColorAllocator::needs_port_probe(template, previous) {
            return Ok(None);
        }
        Ok(self.scheduler.info().await?.local_port_range)
    }
}

/// The most recently started stack of `group`.
///
/// Validation allows at most one; if a race left more, the newest wins.
/// Stacks without a readable start time sort first.
pub fn latest_stack<'a>(group: &str, cluster: &'a [AppState]) -> Option<&'a AppState> {
    stacks_in_group(group, cluster)
        .into_iter()
        .max_by_key(|app| started_at(&app.definition))
}

fn started_at(app: &AppDefinition) -> Option<DateTime<Utc>> {
    let raw = app.label(labels::STARTED_AT)?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

/// Probe seed derived from the allocation's own inputs.
fn probe_seed(started_at: DateTime<Utc>, id: &AppId) -> u64 {
    id.as_str()
        .bytes()
        .fold(started_at.timestamp_micros() as u64, |acc, b| {
            acc.rotate_left(5) ^ u64::from(b)
        })
}
