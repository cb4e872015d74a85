// ABOUTME: Application-wide error types for palette.
// ABOUTME: Uses thiserror for ergonomic error handling and maps errors to exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{DeployError, DeployErrorKind};
use crate::http::ClientError;
use crate::types::AppDefinitionError;

/// Exit code for errors caused by user input or configuration.
pub const EXIT_USER_ERROR: i32 = 2;
/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        source: AppDefinitionError,
    },

    #[error("no application definitions given")]
    NoTemplates,

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code: 2 when the user can fix the input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::AlreadyExists(_)
            | Error::ConfigNotFound(_)
            | Error::MissingEnvVar(_)
            | Error::InvalidConfig(_)
            | Error::Template { .. }
            | Error::NoTemplates
            | Error::Yaml(_) => EXIT_USER_ERROR,
            Error::Deploy(e) if e.kind() == DeployErrorKind::UserInput => EXIT_USER_ERROR,
            Error::Deploy(_) | Error::Client(_) | Error::Io(_) => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
