// ABOUTME: Error types for deployment operations.
// ABOUTME: Separates user input problems, scheduler errors, and failures raised after rollback.

use std::time::Duration;

use crate::http::ClientError;
use crate::scheduler::PortRange;
use crate::types::{AppDefinitionError, AppId};

use super::monitor::FailureReason;
use super::validate::ValidationError;

/// Errors that can occur while deploying an application.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Pre-flight validation rejected the definition.
    #[error("unable to validate deployment: {0}")]
    Validation(#[from] ValidationError),

    /// The definition (or the prior stack's) is malformed.
    #[error("invalid application definition: {0}")]
    Definition(#[from] AppDefinitionError),

    /// The scheduler answered with an error. Never retried.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] ClientError),

    /// The deployment failed and a rollback was attempted.
    #[error("deployment of {app_id} failed: {cause}{}", cleanup_note(.manual_cleanup.as_ref()))]
    DeploymentFailed {
        app_id: AppId,
        cause: FailureCause,
        /// Stack left behind that an operator has to remove.
        manual_cleanup: Option<AppId>,
    },

    /// Random probing found no free alternate port.
    #[error("no free port found in {range} after {attempts} attempts")]
    PortRangeExhausted { range: PortRange, attempts: u32 },

    /// An alternate port is needed but no range is known.
    #[error("no port range configured and the scheduler reports none")]
    NoPortRange,
}

fn cleanup_note(app: Option<&AppId>) -> String {
    match app {
        Some(app) => format!(" (manual intervention required: remove {app})"),
        None => String::new(),
    }
}

/// Error kind for exit code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Caused by what the user asked for; nothing was changed.
    UserInput,
    /// The scheduler rejected a request or could not be reached.
    Remote,
    /// A rollout was attempted and failed.
    Failed,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Validation(_)
            | DeployError::Definition(_)
            | DeployError::NoPortRange => DeployErrorKind::UserInput,
            DeployError::Scheduler(_) => DeployErrorKind::Remote,
            DeployError::DeploymentFailed { .. } | DeployError::PortRangeExhausted { .. } => {
                DeployErrorKind::Failed
            }
        }
    }
}

/// Why a deployment failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureCause {
    #[error("scheduler reported failure: {0}")]
    SchedulerFailed(FailureReason),

    #[error("scheduler deployment did not complete within {}s", .0.as_secs())]
    SchedulerTimeout(Duration),

    #[error("traffic did not cut over before the deadline")]
    SwapTimeout,

    #[error("scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    #[error("traffic cut over but the old stack {0} could not be removed")]
    OldStackNotRemoved(AppId),
}
