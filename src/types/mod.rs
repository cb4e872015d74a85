// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Application definitions, deployment colours, and label conventions.

mod app_definition;
mod color;
mod id;
pub mod labels;

pub use app_definition::{
    AppDefinition, AppDefinitionError, Container, DockerContainer, PortMapping,
};
pub use color::{Color, ParseColorError};
pub use id::{AppId, DeploymentId, Id, TaskId};
