// ABOUTME: In-memory scheduler fake with scripted rollout behaviour.
// ABOUTME: Records submissions and deletions so tests can assert on cluster mutations.

use async_trait::async_trait;
use palette::http::ClientError;
use palette::scheduler::{
    AppState, DeploymentHandle, PortRange, SchedulerClient, SchedulerInfo, Task,
};
use palette::types::{AppDefinition, AppId, DeploymentId, TaskId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;

/// Build a deployed stack the way a previous blue-green run leaves it.
pub fn deployed_stack(id: &str, color: &str, service_port: u16, instances: u32) -> AppState {
    let definition: AppDefinition = serde_json::from_value(json!({
        "id": id,
        "instances": instances,
        "labels": {
            "HAPROXY_DEPLOYMENT_GROUP": "my-app",
            "HAPROXY_DEPLOYMENT_COLOUR": color,
            "HAPROXY_0_PORT": "10000",
            "HAPROXY_DEPLOYMENT_ALT_PORT": "10001",
            "HAPROXY_DEPLOYMENT_TARGET_INSTANCES": instances.to_string(),
            "HAPROXY_DEPLOYMENT_STARTED_AT": "2024-04-30T08:00:00.000Z",
            "HAPROXY_APP_ID": "/my-app"
        },
        "container": {"docker": {"portMappings": [{"containerPort": 8080, "servicePort": service_port}]}}
    }))
    .unwrap();
    running(definition, "old-version", 20000)
}

/// A template as the renderer hands it over.
pub fn template(instances: u32) -> AppDefinition {
    serde_json::from_value(json!({
        "id": "/my-app",
        "instances": instances,
        "cpus": 0.5,
        "labels": {"HAPROXY_DEPLOYMENT_GROUP": "my-app"},
        "container": {"docker": {"portMappings": [{"containerPort": 8080, "servicePort": 10000}]}}
    }))
    .unwrap()
}

/// A template for its own deployment group, with no ports pinned.
pub fn group_template(id: &str, group: &str, service_port: u16) -> AppDefinition {
    serde_json::from_value(json!({
        "id": id,
        "instances": 1,
        "labels": {"HAPROXY_DEPLOYMENT_GROUP": group},
        "container": {"docker": {"portMappings": [{"containerPort": 8080, "servicePort": service_port}]}}
    }))
    .unwrap()
}

fn running(definition: AppDefinition, version: &str, first_port: u16) -> AppState {
    let tasks = (0..definition.instances)
        .map(|i| Task {
            id: TaskId::new(format!("{}.{}", definition.id.trimmed(), i)),
            host: format!("10.0.{}.{}", first_port / 10000, i + 1),
            ports: vec![first_port + i as u16],
        })
        .collect();
    AppState {
        definition,
        version: version.to_string(),
        deployments: Vec::new(),
        tasks_unhealthy: 0,
        tasks,
    }
}

struct Inner {
    apps: Vec<AppState>,
    submitted: Vec<AppDefinition>,
    deleted: Vec<AppId>,
    /// Polls of a new app that still report the deployment in progress.
    pending_polls: u32,
    unhealthy_tasks: u32,
    refuse_delete: HashSet<String>,
    reject_submit: bool,
    port_range: Option<PortRange>,
    next_deployment: u32,
}

pub struct FakeScheduler {
    inner: Mutex<Inner>,
}

impl FakeScheduler {
    pub fn new(apps: Vec<AppState>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                apps,
                submitted: Vec::new(),
                deleted: Vec::new(),
                pending_polls: 1,
                unhealthy_tasks: 0,
                refuse_delete: HashSet::new(),
                reject_submit: false,
                port_range: Some(PortRange {
                    min: 10000,
                    max: 10100,
                }),
                next_deployment: 1,
            }),
        }
    }

    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.inner.lock().pending_polls = polls;
        self
    }

    pub fn with_unhealthy_tasks(self, count: u32) -> Self {
        self.inner.lock().unhealthy_tasks = count;
        self
    }

    pub fn refusing_delete_of(self, id: &str) -> Self {
        self.inner.lock().refuse_delete.insert(id.to_string());
        self
    }

    pub fn rejecting_submissions(self) -> Self {
        self.inner.lock().reject_submit = true;
        self
    }

    pub fn without_port_range(self) -> Self {
        self.inner.lock().port_range = None;
        self
    }

    pub fn app_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .apps
            .iter()
            .map(|a| a.id().as_str().to_string())
            .collect()
    }

    pub fn submitted(&self) -> Vec<AppDefinition> {
        self.inner.lock().submitted.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner
            .lock()
            .deleted
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    /// The most recently submitted app, as currently deployed.
    pub fn latest_submission(&self) -> Option<AppState> {
        let inner = self.inner.lock();
        let last = inner.submitted.last()?;
        inner.apps.iter().find(|a| a.id() == &last.id).cloned()
    }

    pub fn apps(&self) -> Vec<AppState> {
        self.inner.lock().apps.clone()
    }
}

fn not_found(id: &AppId) -> ClientError {
    ClientError::Status {
        url: format!("http://marathon.test/v2/apps{}", id),
        status: 404,
        body: format!("App '{}' does not exist", id),
    }
}

#[async_trait]
impl SchedulerClient for FakeScheduler {
    async fn get_application(&self, id: &AppId) -> Result<AppState, ClientError> {
        let mut inner = self.inner.lock();
        let is_new = inner.submitted.iter().any(|s| &s.id == id);
        let rollout_pending = is_new && inner.pending_polls > 0;
        if rollout_pending {
            inner.pending_polls -= 1;
        }

        let app = inner
            .apps
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| not_found(id))?;
        if !rollout_pending {
            app.deployments.clear();
        }
        Ok(app.clone())
    }

    async fn list_applications(&self) -> Result<Vec<AppState>, ClientError> {
        Ok(self.inner.lock().apps.clone())
    }

    async fn submit(
        &self,
        app: &AppDefinition,
        _force: bool,
    ) -> Result<DeploymentHandle, ClientError> {
        let mut inner = self.inner.lock();
        if inner.reject_submit {
            return Err(ClientError::Status {
                url: "http://marathon.test/v2/apps".to_string(),
                status: 409,
                body: "App is locked by one or more deployments".to_string(),
            });
        }

        let n = inner.next_deployment;
        inner.next_deployment += 1;
        let deployment_id = DeploymentId::new(format!("deployment-{n}"));
        let version = format!("2024-05-01T12:00:0{n}.000Z");

        let mut state = running(app.clone(), &version, 31000);
        state.deployments = vec![deployment_id.clone()];
        state.tasks_unhealthy = inner.unhealthy_tasks;

        inner.apps.retain(|a| a.id() != &app.id);
        inner.apps.push(state);
        inner.submitted.push(app.clone());

        Ok(DeploymentHandle {
            deployment_id,
            application_id: app.id.clone(),
            expected_version: version,
        })
    }

    async fn delete_application(&self, id: &AppId) -> Result<bool, ClientError> {
        let mut inner = self.inner.lock();
        if inner.refuse_delete.contains(id.as_str()) {
            return Ok(false);
        }
        let before = inner.apps.len();
        inner.apps.retain(|a| a.id() != id);
        if inner.apps.len() == before {
            return Err(not_found(id));
        }
        inner.deleted.push(id.clone());
        Ok(true)
    }

    async fn info(&self) -> Result<SchedulerInfo, ClientError> {
        Ok(SchedulerInfo {
            local_port_range: self.inner.lock().port_range,
        })
    }
}
