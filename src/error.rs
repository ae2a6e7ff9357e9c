use crate::config::ConfigError;
use crate::domain::ValidationError;
use crate::orchestration::CostingError;
use thiserror::Error;

/// Top-level error of the command-line binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Costing(#[from] CostingError),
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Malformed shipment file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
}
