use ragline_protocol::InvokeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector has zero norm or non-finite components")]
    DegenerateVector,

    #[error("Embedding model mismatch: store holds '{expected}', got '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("k must be at least 1")]
    InvalidK,
}

impl VectorStoreError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

impl From<InvokeError> for VectorStoreError {
    fn from(err: InvokeError) -> Self {
        Self::Provider(err.to_string())
    }
}
