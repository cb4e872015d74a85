// ABOUTME: Scheduler seam: deployed application state, submission handles, and the client trait.
// ABOUTME: The deployment flow reads and mutates the cluster only through SchedulerClient.

mod marathon;

pub use marathon::Marathon;

use crate::http::ClientError;
use crate::types::{AppDefinition, AppId, DeploymentId, TaskId};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};
use std::fmt;

/// Status fields the scheduler adds to a deployed app that are not part of
/// its definition.
const STATUS_FIELDS: &[&str] = &[
    "version",
    "versionInfo",
    "deployments",
    "tasks",
    "tasksStaged",
    "tasksRunning",
    "tasksHealthy",
    "tasksUnhealthy",
    "lastTaskFailure",
    "taskStats",
];

/// Operations the deployment flow needs from the cluster scheduler.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn get_application(&self, id: &AppId) -> Result<AppState, ClientError>;

    async fn list_applications(&self) -> Result<Vec<AppState>, ClientError>;

    /// Submit a definition. Conflicts are surfaced, never retried.
    async fn submit(
        &self,
        app: &AppDefinition,
        force: bool,
    ) -> Result<DeploymentHandle, ClientError>;

    /// Delete an application. `Ok(false)` when the scheduler refused.
    async fn delete_application(&self, id: &AppId) -> Result<bool, ClientError>;

    async fn info(&self) -> Result<SchedulerInfo, ClientError>;
}

/// A deployed application as the scheduler currently sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub definition: AppDefinition,
    pub version: String,
    /// Deployments still acting on this app.
    pub deployments: Vec<DeploymentId>,
    pub tasks_unhealthy: u32,
    pub tasks: Vec<Task>,
}

/// A running instance of an application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub host: String,
    #[serde(default)]
    pub ports: Vec<u16>,
}

/// Returned by a successful submission; consumed by the deployment monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentHandle {
    pub deployment_id: DeploymentId,
    pub application_id: AppId,
    pub expected_version: String,
}

/// Inclusive range of ports the scheduler hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerInfo {
    /// Range service ports are allocated from, if the scheduler reports one.
    pub local_port_range: Option<PortRange>,
}

#[derive(Deserialize)]
struct DeploymentRef {
    id: DeploymentId,
}

impl AppState {
    /// Split a scheduler app document into its definition and its status.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut map) = value else {
            return Err(serde_json::Error::custom("application is not a JSON object"));
        };

        let version: Option<String> = take(&mut map, "version")?;
        let deployments: Vec<DeploymentRef> = take(&mut map, "deployments")?;
        let tasks: Vec<Task> = take(&mut map, "tasks")?;
        let tasks_unhealthy: u32 = take(&mut map, "tasksUnhealthy")?;
        for key in STATUS_FIELDS {
            map.remove(*key);
        }

        Ok(Self {
            definition: serde_json::from_value(Value::Object(map))?,
            version: version.unwrap_or_default(),
            deployments: deployments.into_iter().map(|d| d.id).collect(),
            tasks_unhealthy,
            tasks,
        })
    }

    pub fn id(&self) -> &AppId {
        &self.definition.id
    }

    pub fn is_deploying(&self, deployment: &DeploymentId) -> bool {
        self.deployments.contains(deployment)
    }
}

/// Remove `key` and decode it, treating absent and null as the default.
fn take<T: DeserializeOwned + Default>(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<T, serde_json::Error> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_state_separates_status_from_definition() {
        let state = AppState::from_value(json!({
            "id": "/my-app-blue",
            "instances": 2,
            "cpus": 0.1,
            "labels": {"HAPROXY_DEPLOYMENT_GROUP": "my-app"},
            "version": "2017-03-01T12:00:00.000Z",
            "deployments": [{"id": "d-1"}],
            "tasksUnhealthy": 1,
            "tasksRunning": 2,
            "tasks": [
                {"id": "t-1", "host": "10.0.0.1", "ports": [31000], "appId": "/my-app-blue"},
                {"id": "t-2", "host": "10.0.0.2", "ports": [31001]}
            ]
        }))
        .unwrap();

        assert_eq!(state.id().as_str(), "/my-app-blue");
        assert_eq!(state.version, "2017-03-01T12:00:00.000Z");
        assert!(state.is_deploying(&DeploymentId::new("d-1")));
        assert_eq!(state.tasks_unhealthy, 1);
        assert_eq!(state.tasks.len(), 2);
        assert_eq!(state.tasks[1].ports, vec![31001]);
        assert!(!state.definition.extra.contains_key("tasksRunning"));
        assert!(!state.definition.extra.contains_key("version"));
        assert!(state.definition.extra.contains_key("cpus"));
    }

    #[test]
    fn missing_status_fields_default() {
        let state = AppState::from_value(json!({"id": "/idle"})).unwrap();
        assert!(state.deployments.is_empty());
        assert!(state.tasks.is_empty());
        assert_eq!(state.tasks_unhealthy, 0);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(AppState::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn port_range_display_and_bounds() {
        let range = PortRange {
            min: 10000,
            max: 10100,
        };
        assert_eq!(range.to_string(), "10000-10100");
        assert!(!range.is_empty());
    }
}
