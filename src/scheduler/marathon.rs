// ABOUTME: SchedulerClient implementation over Marathon's REST API.
// ABOUTME: Fetches apps with embedded tasks and deployments, submits, deletes, and reads port config.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use snafu::ResultExt;

use crate::http::{ClientError, DecodeSnafu, Endpoint};
use crate::types::{AppDefinition, AppId, DeploymentId};

use super::{AppState, DeploymentHandle, PortRange, SchedulerClient, SchedulerInfo};

const APP_EMBED: &str = "embed=app.tasks&embed=app.counts&embed=app.deployments";
const APPS_EMBED: &str = "embed=apps.tasks&embed=apps.counts&embed=apps.deployments";

/// Marathon REST client.
#[derive(Debug, Clone)]
pub struct Marathon {
    endpoint: Endpoint,
}

#[derive(Deserialize)]
struct AppEnvelope {
    app: Value,
}

#[derive(Deserialize)]
struct AppsEnvelope {
    apps: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    deployment_id: DeploymentId,
    version: String,
}

#[derive(Deserialize)]
struct InfoResponse {
    #[serde(default)]
    marathon_config: MarathonConfig,
}

#[derive(Deserialize, Default)]
struct MarathonConfig {
    local_port_min: Option<u16>,
    local_port_max: Option<u16>,
}

impl Marathon {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: Endpoint::parse(url)?,
        })
    }

    fn decode_app(&self, path: &str, app: Value) -> Result<AppState, ClientError> {
        AppState::from_value(app).context(DecodeSnafu {
            url: self.endpoint.url(path),
        })
    }
}

/// `/v2/apps/{id}` with each id segment percent-encoded.
fn app_path(id: &AppId) -> String {
    let segments: Vec<String> = id
        .trimmed()
        .split('/')
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();
    format!("/v2/apps/{}", segments.join("/"))
}

#[async_trait]
impl SchedulerClient for Marathon {
    async fn get_application(&self, id: &AppId) -> Result<AppState, ClientError> {
        let path = format!("{}?{}", app_path(id), APP_EMBED);
        let envelope: AppEnvelope = self
            .endpoint
            .get(&path)
            .await?
            .error_for_status()?
            .json()?;
        self.decode_app(&path, envelope.app)
    }

    async fn list_applications(&self) -> Result<Vec<AppState>, ClientError> {
        let path = format!("/v2/apps?{}", APPS_EMBED);
        let envelope: AppsEnvelope = self
            .endpoint
            .get(&path)
            .await?
            .error_for_status()?
            .json()?;
        envelope
            .apps
            .into_iter()
            .map(|app| self.decode_app(&path, app))
            .collect()
    }

    async fn submit(
        &self,
        app: &AppDefinition,
        force: bool,
    ) -> Result<DeploymentHandle, ClientError> {
        let mut path = app_path(&app.id);
        if force {
            path.push_str("?force=true");
        }

        // A 409 means another deployment holds the app; it is reported as is.
        let response: SubmitResponse = self
            .endpoint
            .put_json(&path, app)
            .await?
            .error_for_status()?
            .json()?;
        tracing::debug!(
            "submitted {} as deployment {} (version {})",
            app.id,
            response.deployment_id,
            response.version
        );

        Ok(DeploymentHandle {
            deployment_id: response.deployment_id,
            application_id: app.id.clone(),
            expected_version: response.version,
        })
    }

    async fn delete_application(&self, id: &AppId) -> Result<bool, ClientError> {
        let response = self.endpoint.delete(&app_path(id)).await?;
        if !response.is_success() {
            tracing::debug!("deleting {} returned {}: {}", id, response.status, response.text());
        }
        Ok(response.is_success())
    }

    async fn info(&self) -> Result<SchedulerInfo, ClientError> {
        let info: InfoResponse = self
            .endpoint
            .get("/v2/info")
            .await?
            .error_for_status()?
            .json()?;
        let config = info.marathon_config;
        let local_port_range = match (config.local_port_min, config.local_port_max) {
            (Some(min), Some(max)) => Some(PortRange { min, max }),
            _ => None,
        };
        Ok(SchedulerInfo { local_port_range })
    }
}
