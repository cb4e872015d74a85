// ABOUTME: Deploy command implementation.
// ABOUTME: Loads templates, builds the clients, confirms, and runs the selected strategy.

use nonempty::NonEmpty;
use palette::balancer::MarathonLb;
use palette::clock::SystemClock;
use palette::config::Config;
use palette::deploy::{BlueGreenDeployment, DeployStrategy, StandardDeployment};
use palette::error::{Error, Result};
use palette::output::Output;
use palette::scheduler::Marathon;
use palette::types::AppDefinition;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const CONFIRM_PROMPT: &str = "Continue with deployment?";

/// What the user asked `palette deploy` to do.
pub struct DeployRequest {
    pub templates: Vec<PathBuf>,
    pub strategy: Option<DeployStrategy>,
    pub timeout: Option<Duration>,
    pub force: bool,
    pub dry_run: bool,
}

pub async fn deploy(config: Config, request: DeployRequest, mut output: Output) -> Result<()> {
    let templates = load_templates(&request.templates)?;
    let strategy = DeployStrategy::select(request.strategy, config.strategy);
    let settings = config.deploy_settings(request.timeout);

    let scheduler = Marathon::new(&config.marathon_url()?)?;
    let clock = SystemClock;

    output.start_timer();
    output.progress(&format!(
        "Deploying {} application(s) with the {} strategy",
        templates.len(),
        strategy.as_str()
    ));

    let apps: Vec<AppDefinition> = templates.into_iter().collect();

    let deployed: Vec<String> = match strategy {
        DeployStrategy::BlueGreen => {
            check_distinct_groups(&apps)?;
            let balancer = MarathonLb::new(&config.marathon_lb_url()?)?;
            let orchestrator = BlueGreenDeployment::new(&scheduler, &balancer, &clock, settings);

            for prepared in orchestrator.preview(&apps).await? {
                output.definition(&prepared.app);
                if let Some(port) = prepared.ignored_service_port {
                    output.warning(&format!(
                        "{} keeps its group's ports, declared service port {} is ignored",
                        prepared.app.id, port
                    ));
                }
            }

            if !proceed(&request, &output)? {
                return Ok(());
            }

            // Each app is prepared again against the cluster its predecessors left
            let mut deployed = Vec::with_capacity(apps.len());
            for template in &apps {
                output.progress(&format!("  → Deploying {}...", template.id));
                let app = orchestrator
                    .deploy_template(template, request.force)
                    .await?;
                output.progress(&format!("  ✓ {} is live", app.id));
                deployed.push(app.id.into_inner());
            }
            deployed
        }
        DeployStrategy::Standard => {
            for template in &apps {
                output.definition(template);
            }

            if !proceed(&request, &output)? {
                return Ok(());
            }

            StandardDeployment::new(&scheduler, &clock, settings)
                .execute(&apps, request.force)
                .await?
                .into_iter()
                .map(|handle| handle.application_id.into_inner())
                .collect()
        }
    };

    output.success(&format!("Deployed {}", deployed.join(", ")));
    Ok(())
}

/// Whether to go on after the definitions have been shown.
fn proceed(request: &DeployRequest, output: &Output) -> Result<bool> {
    if request.dry_run {
        output.success("Dry run complete, nothing was deployed");
        return Ok(false);
    }
    if request.force {
        return Ok(true);
    }
    let confirmed = output.confirm(CONFIRM_PROMPT)?;
    if !confirmed {
        output.progress("Deployment cancelled");
    }
    Ok(confirmed)
}

fn load_templates(paths: &[PathBuf]) -> Result<NonEmpty<AppDefinition>> {
    let mut apps = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(path)?;
        let parsed = AppDefinition::parse_many(&content).map_err(|source| Error::Template {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("loaded {} definition(s) from {}", parsed.len(), path.display());
        apps.extend(parsed);
    }
    NonEmpty::from_vec(apps).ok_or(Error::NoTemplates)
}

/// Two templates in one group would both be prepared against the same
/// prior stack.
fn check_distinct_groups(templates: &[AppDefinition]) -> Result<()> {
    let mut seen: HashMap<&str, &AppDefinition> = HashMap::new();
    for app in templates.iter() {
        let Some(group) = app.deployment_group() else {
            continue;
        };
        if let Some(first) = seen.insert(group, app) {
            return Err(Error::InvalidConfig(format!(
                "{} and {} share deployment group '{}'",
                first.id, app.id, group
            )));
        }
    }
    Ok(())
}
