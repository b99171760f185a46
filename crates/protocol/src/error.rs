use thiserror::Error;

pub type Result<T> = std::result::Result<T, InvokeError>;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Undecodable model response: {0}")]
    Decode(String),

    #[error("Model response is missing '{0}'")]
    MissingField(String),

    #[error("Unsupported model '{0}'")]
    UnsupportedModel(String),

    #[error("Model '{model_id}' cannot run task '{task}'")]
    UnsupportedTask { model_id: String, task: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InvokeError {
    /// True for failures of the call itself rather than of its payload
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Status { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}
