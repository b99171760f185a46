use crate::error::{ChainError, Result};
use ragline_vector_store::{
    ContentUnit, EmbeddingProvider, RetrievalResult, VectorStore, VectorStoreError,
};
use std::sync::Arc;

/// Embeds a query and returns the `k` most similar stored units
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        k: usize,
    ) -> Result<Self> {
        if k == 0 {
            return Err(VectorStoreError::InvalidK.into());
        }
        Ok(Self { store, provider, k })
    }

    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Ranked content, best match first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContentUnit>> {
        Ok(self
            .retrieve_scored(query)
            .await?
            .into_iter()
            .map(|hit| hit.unit)
            .collect())
    }

    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(ChainError::InvalidInput("query is empty".to_string()));
        }
        let vector = self.provider.embed_text(query).await?;
        let hits = self.store.query(&vector, self.k)?;
        log::debug!("Retrieved {} of k={} for {query:?}", hits.len(), self.k);
        Ok(hits)
    }
}
