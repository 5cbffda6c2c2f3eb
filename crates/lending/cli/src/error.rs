//! CLI error types

use lending_client::ClientError;
use lending_types::LendingError;
use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{} ({})", .0, .0.code())]
    Lending(#[from] LendingError),

    #[error("{} ({})", .0, .0.code())]
    Client(#[from] ClientError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
