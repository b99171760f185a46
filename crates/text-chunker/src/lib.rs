//! # Ragline Text Chunker
//!
//! Splits long documents into ordered, independently embeddable text units.
//!
//! ## Splitting policy
//!
//! ```text
//! Document
//!     │
//!     ├──> Scan for the earliest configured separator
//!     │      └─> ties at the same position: longest separator wins
//!     │
//!     ├──> Emit everything before it as one chunk
//!     │      └─> separator kept at the end, kept at the start, or consumed
//!     │
//!     ├──> Repeat on the remainder
//!     │
//!     └──> Optional grapheme cap cuts oversized chunks further
//! ```
//!
//! Chunking is total: for a valid configuration every string input produces a
//! (possibly empty) chunk sequence, and [`reassemble`] restores the document
//! byte for byte.
//!
//! ## Example
//!
//! ```rust
//! use ragline_text_chunker::{reassemble, Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::sentences()).unwrap();
//! let text = "Don likes pizza. Don likes pasta. The weather is nice.";
//!
//! let chunks = chunker.split(text);
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(reassemble(&chunks), text);
//! ```

mod chunker;
mod config;
mod error;
mod types;

pub use chunker::{reassemble, Chunker};
pub use config::{ChunkerConfig, SeparatorPlacement};
pub use error::{ChunkerError, Result};
pub use types::TextChunk;
