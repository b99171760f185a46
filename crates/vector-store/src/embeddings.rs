use crate::error::{Result, VectorStoreError};
use crate::types::{Content, ContentUnit, EmbeddingKind, EmbeddingVector};
use async_trait::async_trait;
use ragline_protocol::{
    stub_embedding, stub_text_embedding, ModelClient, ModelFamily, DEFAULT_STUB_DIMENSION,
};
use std::collections::HashMap;

/// Maps content units to embedding vectors.
///
/// Providers are shared across concurrent ingestion tasks, so they must be
/// `Send + Sync`. Every vector a provider returns carries its `model_id`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn kind(&self) -> EmbeddingKind;

    async fn embed(&self, unit: &ContentUnit) -> Result<EmbeddingVector>;

    async fn embed_text(&self, text: &str) -> Result<EmbeddingVector> {
        self.embed(&ContentUnit::text(text)).await
    }
}

/// Embeds through a hosted embedding model
#[derive(Debug, Clone)]
pub struct ModelEmbedder {
    client: ModelClient,
    model_id: String,
    kind: EmbeddingKind,
}

impl ModelEmbedder {
    /// Fails when `model_id` does not name a text or image embedding model
    pub fn new(client: ModelClient, model_id: impl Into<String>) -> Result<Self> {
        let model_id = model_id.into();
        let kind = match ModelFamily::detect(&model_id) {
            Some(ModelFamily::TitanEmbedText) => EmbeddingKind::Text,
            Some(ModelFamily::TitanEmbedImage) => EmbeddingKind::Image,
            _ => {
                return Err(VectorStoreError::provider(format!(
                    "'{model_id}' is not an embedding model"
                )))
            }
        };
        Ok(Self {
            client,
            model_id,
            kind,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for ModelEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn kind(&self) -> EmbeddingKind {
        self.kind
    }

    async fn embed(&self, unit: &ContentUnit) -> Result<EmbeddingVector> {
        let values = match (&unit.content, self.kind) {
            (Content::Text(text), EmbeddingKind::Text) => {
                self.client.embed_text(&self.model_id, text.as_str()).await?
            }
            (Content::Image(bytes), EmbeddingKind::Image) => {
                self.client.embed_image(&self.model_id, bytes.clone()).await?
            }
            (_, kind) => {
                return Err(VectorStoreError::provider(format!(
                    "{kind:?} embedding model '{}' cannot embed {:?} content",
                    self.model_id,
                    unit.kind()
                )))
            }
        };
        if values.is_empty() {
            return Err(VectorStoreError::provider(format!(
                "model '{}' returned an empty embedding",
                self.model_id
            )));
        }
        Ok(EmbeddingVector::new(values, self.model_id.clone()))
    }
}

/// Deterministic offline embeddings.
///
/// Text is embedded as a hashed bag of words, so units sharing words score
/// higher than unrelated ones; images hash their raw bytes.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    model_id: String,
    dimension: usize,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

impl StubEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            model_id: "stub-embedding".to_string(),
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn kind(&self) -> EmbeddingKind {
        EmbeddingKind::Text
    }

    async fn embed(&self, unit: &ContentUnit) -> Result<EmbeddingVector> {
        let values = match &unit.content {
            Content::Text(text) => stub_text_embedding(text, self.dimension),
            Content::Image(bytes) => stub_embedding(bytes, self.dimension),
        };
        Ok(EmbeddingVector::new(values, self.model_id.clone()))
    }
}

/// Hand-written vectors looked up by exact text; useful for pinning rankings in tests
#[derive(Debug, Clone)]
pub struct FixedEmbedder {
    model_id: String,
    table: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            table: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, text: impl Into<String>, values: Vec<f32>) -> Self {
        self.table.insert(text.into(), values);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn kind(&self) -> EmbeddingKind {
        EmbeddingKind::Text
    }

    async fn embed(&self, unit: &ContentUnit) -> Result<EmbeddingVector> {
        let text = unit
            .as_text()
            .ok_or_else(|| VectorStoreError::provider("fixed embedder only embeds text"))?;
        let values = self
            .table
            .get(text)
            .cloned()
            .ok_or_else(|| VectorStoreError::provider(format!("no fixed vector for {text:?}")))?;
        Ok(EmbeddingVector::new(values, self.model_id.clone()))
    }
}
