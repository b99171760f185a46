use ragline_protocol::InvokeError;
use ragline_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Store(#[from] VectorStoreError),

    #[error("Generation failed: {0}")]
    Generation(#[from] InvokeError),

    #[error("Missing prompt variable '{0}'")]
    MissingVariable(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ChainError {
    /// True when the model endpoint itself failed (unreachable, timed out, non-2xx)
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Generation(err) if err.is_transport())
    }
}
