use thiserror::Error;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Malformed attribute: {0}")]
    MalformedAttribute(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("No value info for tensor: {0}")]
    UnknownTensor(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid numeric mode: {0}")]
    InvalidMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Failed to load program from {0}: {1}")]
    ModelLoadError(PathBuf, String),
}
