//! # Ragline Protocol
//!
//! Everything that crosses the process boundary: hosted-model invocation,
//! per-family request/response shapes, and object storage.
//!
//! ```text
//! ModelTask ──into_request(model_id)──> ModelRequest ──ModelInvoker──> JSON
//!                                                                       │
//!            TaskOutput <──decode_{generated_text,embedding,image}──────┘
//! ```
//!
//! [`HttpInvoker`] talks to a real runtime endpoint; [`StubInvoker`] answers
//! locally with deterministic payloads of the same shape.

mod client;
mod error;
mod invoker;
mod object_store;
mod response;
mod stub;
mod task;

pub use client::{ModelClient, TaskOutput};
pub use error::{InvokeError, ObjectStoreError, Result};
pub use invoker::{
    HttpInvoker, HttpInvokerConfig, ModelInvoker, ModelRequest, DEFAULT_REGION, DEFAULT_TIMEOUT,
    JSON_MIME,
};
pub use object_store::{LocalObjectStore, ObjectResult, ObjectStore};
pub use response::{decode_embedding, decode_generated_text, decode_image};
pub use stub::{
    stub_embedding, stub_text_embedding, StubInvoker, DEFAULT_STUB_DIMENSION, STUB_PNG,
};
pub use task::{
    ImageConfig, ImageGeneration, ModelFamily, ModelTask, SamplingParams, TaskKind,
};
