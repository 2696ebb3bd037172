use thiserror::Error;

/// Top-level error type for the family tree service.
#[derive(Error, Debug)]
pub enum FamilyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown configuration option: {0}")]
    UnknownOption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for FamilyError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
