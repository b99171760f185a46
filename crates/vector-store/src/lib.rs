//! # Ragline Vector Store
//!
//! Embedding providers, cosine similarity and an exact, in-memory vector store.
//!
//! ## Architecture
//!
//! ```text
//! ContentUnit[]
//!     │
//!     ├──> EmbeddingProvider (hosted model, stub, or fixed table)
//!     │      └─> EmbeddingVector { values, model }
//!     │
//!     ├──> Ingestor
//!     │      └─> bounded fan-out, results joined in input order
//!     │
//!     └──> VectorStore
//!            └─> linear scan, stable top-k by cosine similarity
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ragline_vector_store::{ContentUnit, EmbeddingVector, IndexedEntry, VectorStore};
//!
//! let store = VectorStore::new();
//! store
//!     .add(vec![
//!         IndexedEntry::new(ContentUnit::text("north"), EmbeddingVector::new(vec![0.0, 1.0], "m")),
//!         IndexedEntry::new(ContentUnit::text("east"), EmbeddingVector::new(vec![1.0, 0.0], "m")),
//!     ])
//!     .unwrap();
//!
//! let hits = store.query(&EmbeddingVector::new(vec![0.9, 0.1], "m"), 1).unwrap();
//! assert_eq!(hits[0].unit.as_text(), Some("east"));
//! ```

mod embeddings;
mod error;
mod index;
mod ingest;
mod similarity;
mod store;
mod types;

pub use embeddings::{EmbeddingProvider, FixedEmbedder, ModelEmbedder, StubEmbedder};
pub use error::{Result, VectorStoreError};
pub use ingest::{Ingestor, DEFAULT_CONCURRENCY};
pub use similarity::cosine_similarity;
pub use store::VectorStore;
pub use types::{
    Content, ContentUnit, EmbeddingKind, EmbeddingVector, IndexedEntry, RetrievalResult,
    UnitMetadata,
};
