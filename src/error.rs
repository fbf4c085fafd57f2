//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
