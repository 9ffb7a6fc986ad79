// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Detection source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Malformed recording at line {line}: {reason}")]
    Recording { line: usize, reason: String },

    #[error("Session task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}
