// ABOUTME: Structured scheduler application definition with an open extension map.
// ABOUTME: Models id, instances, labels, and port mappings; keeps unknown fields verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::color::Color;
use super::id::AppId;
use super::labels;

#[derive(Debug, Error)]
pub enum AppDefinitionError {
    #[error("application definition has an empty id")]
    EmptyId,

    #[error("application definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no application definitions found")]
    Empty,

    #[error("{0} declares neither a port mapping nor a port")]
    NoServicePort(AppId),

    #[error("label {label} has invalid port value '{value}'")]
    InvalidPortLabel { label: &'static str, value: String },

    #[error("label {label} has invalid value '{value}'")]
    InvalidLabel { label: &'static str, value: String },

    #[error("{app_id} has no {label} label")]
    MissingLabel { app_id: AppId, label: &'static str },
}

/// An application definition as submitted to the scheduler.
///
/// The fields the deployment logic reads and writes are modelled explicitly.
/// Everything else the scheduler understands (cpus, mem, health checks, ...)
/// rides along in `extra` and is serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    pub id: AppId,

    #[serde(default)]
    pub instances: u32,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerContainer>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerContainer {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<PortMapping>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppDefinition {
    /// Parse a single definition and check it at the boundary.
    pub fn from_json(json: &str) -> Result<Self, AppDefinitionError> {
        let app: AppDefinition = serde_json::from_str(json)?;
        app.validate()?;
        Ok(app)
    }

    /// Parse a document holding either one definition or an array of them.
    pub fn parse_many(json: &str) -> Result<Vec<Self>, AppDefinitionError> {
        let value: Value = serde_json::from_str(json)?;
        let apps: Vec<AppDefinition> = match value {
            Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };

        if apps.is_empty() {
            return Err(AppDefinitionError::Empty);
        }
        for app in &apps {
            app.validate()?;
        }
        Ok(apps)
    }

    pub fn validate(&self) -> Result<(), AppDefinitionError> {
        if self.id.trimmed().is_empty() {
            return Err(AppDefinitionError::EmptyId);
        }
        Ok(())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn set_label(&mut self, key: &str, value: impl Into<String>) {
        self.labels.insert(key.to_string(), value.into());
    }

    pub fn deployment_group(&self) -> Option<&str> {
        self.label(labels::DEPLOYMENT_GROUP)
    }

    /// The colour label, if present and recognised.
    pub fn color(&self) -> Result<Option<Color>, AppDefinitionError> {
        match self.label(labels::DEPLOYMENT_COLOUR) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| AppDefinitionError::InvalidLabel {
                    label: labels::DEPLOYMENT_COLOUR,
                    value: value.to_string(),
                }),
        }
    }

    /// Read a label holding a port number.
    pub fn port_label(&self, key: &'static str) -> Result<Option<u16>, AppDefinitionError> {
        match self.label(key) {
            None => Ok(None),
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                AppDefinitionError::InvalidPortLabel {
                    label: key,
                    value: value.to_string(),
                }
            }),
        }
    }

    /// The instance count the load balancer must observe before cutover.
    pub fn target_instances(&self) -> Result<Option<u32>, AppDefinitionError> {
        match self.label(labels::TARGET_INSTANCES) {
            None => Ok(None),
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                AppDefinitionError::InvalidLabel {
                    label: labels::TARGET_INSTANCES,
                    value: value.to_string(),
                }
            }),
        }
    }

    /// The port the application is currently exposed on externally.
    ///
    /// Docker apps carry it on their first port mapping; plain apps on their
    /// first declared port.
    pub fn service_port(&self) -> Option<u16> {
        self.first_port_mapping()
            .and_then(|m| m.service_port)
            .or_else(|| self.ports.first().copied())
    }

    /// Set the externally exposed port, wherever this app declares it.
    pub fn set_service_port(&mut self, port: u16) -> Result<(), AppDefinitionError> {
        let id = self.id.clone();
        if let Some(mapping) = self
            .container
            .as_mut()
            .and_then(|c| c.docker.as_mut())
            .and_then(|d| d.port_mappings.first_mut())
        {
            mapping.service_port = Some(port);
            return Ok(());
        }

        match self.ports.first_mut() {
            Some(first) => {
                *first = port;
                Ok(())
            }
            None => Err(AppDefinitionError::NoServicePort(id)),
        }
    }

    fn first_port_mapping(&self) -> Option<&PortMapping> {
        self.container
            .as_ref()
            .and_then(|c| c.docker.as_ref())
            .and_then(|d| d.port_mappings.first())
    }
}
