use ragline_text_chunker::TextChunk;
use serde::{Deserialize, Serialize};

/// What an embedding provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    Text,
    Image,
}

/// Fixed-length embedding tagged with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    values: Vec<f32>,
    model: String,
}

impl EmbeddingVector {
    pub fn new(values: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            values,
            model: model.into(),
        }
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Image(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// A retrievable piece of content: a chunk of text or an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub content: Content,
    #[serde(default)]
    pub metadata: UnitMetadata,
}

impl ContentUnit {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            metadata: UnitMetadata::default(),
        }
    }

    #[must_use]
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            content: Content::Image(bytes),
            metadata: UnitMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> EmbeddingKind {
        match self.content {
            Content::Text(_) => EmbeddingKind::Text,
            Content::Image(_) => EmbeddingKind::Image,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Image(_) => None,
        }
    }
}

impl From<TextChunk> for ContentUnit {
    fn from(chunk: TextChunk) -> Self {
        Self {
            content: Content::Text(chunk.text),
            metadata: UnitMetadata {
                source: chunk.source,
                index: Some(chunk.index),
                offset: Some(chunk.offset),
            },
        }
    }
}

/// A content unit stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub unit: ContentUnit,
    pub vector: EmbeddingVector,
}

impl IndexedEntry {
    #[must_use]
    pub const fn new(unit: ContentUnit, vector: EmbeddingVector) -> Self {
        Self { unit, vector }
    }
}

/// One hit of a similarity query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub unit: ContentUnit,
    pub score: f32,
    /// Insertion position of the entry in its store
    pub position: usize,
}
