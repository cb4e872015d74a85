// ABOUTME: Pre-flight checks run before a blue-green deployment mutates anything.
// ABOUTME: Requires the deployment group label and at most one deployed stack per group.

use thiserror::Error;

use crate::scheduler::{AppState, SchedulerClient};
use crate::types::{AppDefinition, AppId, labels};

use super::error::DeployError;

/// Labels every blue-green definition must carry.
pub const REQUIRED_LABELS: &[&str] = &[labels::DEPLOYMENT_GROUP];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing label(s) from application definition {app_id}: {}", .labels.join(", "))]
    MissingLabels {
        app_id: AppId,
        labels: Vec<&'static str>,
    },

    #[error(
        "{count} application stacks are active in deployment group '{group}', resolve \
         this before continuing (another deploy may be in progress, or a previous one failed)"
    )]
    MultipleStacks { group: String, count: usize },
}

/// Check the definition carries every required label with a non-empty value.
pub fn check_labels(app: &AppDefinition) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = REQUIRED_LABELS
        .iter()
        .copied()
        .filter(|label| app.label(label).is_none_or(|v| v.trim().is_empty()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingLabels {
            app_id: app.id.clone(),
            labels: missing,
        })
    }
}

/// Deployed apps sharing `group`.
pub fn stacks_in_group<'a>(group: &str, deployed: &'a [AppState]) -> Vec<&'a AppState> {
    deployed
        .iter()
        .filter(|app| app.definition.deployment_group() == Some(group))
        .collect()
}

/// Check that at most one stack of the app's group is deployed.
///
/// This is advisory: a concurrent deploy between this check and submission
/// is not detected.
pub fn check_cluster_state(
    app: &AppDefinition,
    deployed: &[AppState],
) -> Result<(), ValidationError> {
    let Some(group) = app.deployment_group() else {
        return check_labels(app);
    };

    let count = stacks_in_group(group, deployed).len();
    if count > 1 {
        return Err(ValidationError::MultipleStacks {
            group: group.to_string(),
            count,
        });
    }
    Ok(())
}

/// Runs the label check, then the scheduler state check.
pub struct PreflightValidator<'a> {
    scheduler: &'a dyn SchedulerClient,
}

impl<'a> PreflightValidator<'a> {
    pub fn new(scheduler: &'a dyn SchedulerClient) -> Self {
        Self { scheduler }
    }

    /// Validate `app` and return the deployed apps the decision was based on.
    pub async fn validate(&self, app: &AppDefinition) -> Result<Vec<AppState>, DeployError> {
        check_labels(app)?;

        let deployed = self.scheduler.list_applications().await?;
        check_cluster_state(app, &deployed)?;
        tracing::debug!("{} passed pre-flight checks", app.id);
        Ok(deployed)
    }
}
