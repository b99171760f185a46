//! # Ragline Chain
//!
//! The query side of retrieval-augmented generation.
//!
//! ```text
//! question
//!     │
//!     ├──> Retriever ──> EmbeddingProvider ──> VectorStore::query (top-k)
//!     │
//!     ├──> PromptTemplate::render  ({context}, {input}, ...)
//!     │
//!     └──> GenerationChain ──> ModelInvoker ──> answer text
//! ```
//!
//! [`RagPipeline`] wires the whole flow together, including chunked ingestion.
//! [`ChatSession`] keeps a bounded multi-turn history on top of a
//! [`GenerationChain`].
//!
//! ## Example
//!
//! ```rust
//! use ragline_chain::{PromptTemplate, PromptVariables};
//!
//! let template = PromptTemplate::new("Answer based on: {context}");
//! let vars = PromptVariables::new().with("context", vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(template.render(&vars).unwrap().to_text(), "Answer based on: a\nb");
//! ```

mod chat;
mod error;
mod generation;
mod pipeline;
mod prompt;
mod retriever;
pub mod templates;

pub use chat::{ChatSession, ChatTurn, HistoryPolicy};
pub use error::{ChainError, Result};
pub use generation::GenerationChain;
pub use pipeline::{RagAnswer, RagPipeline};
pub use prompt::{
    ComposedMessage, ComposedPrompt, PromptMessage, PromptTemplate, PromptValue, PromptVariables,
    Role,
};
pub use ragline_protocol::SamplingParams;
pub use retriever::Retriever;
