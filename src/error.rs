//! Error types for propylon

/// Main error type for the gate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Attribute decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Attribute JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn unknown_filter(name: impl Into<String>) -> Self {
        Error::UnknownFilter(name.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
