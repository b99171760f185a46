use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::store::VectorStore;
use crate::types::{ContentUnit, IndexedEntry};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Embeds content units concurrently and appends them to a store in input order
#[derive(Clone)]
pub struct Ingestor {
    provider: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
}

impl Ingestor {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed `units` with at most `concurrency` calls in flight.
    ///
    /// Results are joined in input order regardless of completion order, and
    /// the batch lands in the store through a single `add`: the first failure
    /// aborts the call with nothing appended. Returns the number of units added.
    pub async fn ingest(&self, store: &VectorStore, units: Vec<ContentUnit>) -> Result<usize> {
        if units.is_empty() {
            return Ok(0);
        }
        let total = units.len();
        log::debug!(
            "Embedding {total} units with '{}' (concurrency {})",
            self.provider.model_id(),
            self.concurrency
        );

        let provider = &self.provider;
        let entries: Vec<IndexedEntry> = stream::iter(units)
            .map(|unit| async move {
                let vector = provider.embed(&unit).await?;
                Ok::<_, crate::error::VectorStoreError>(IndexedEntry::new(unit, vector))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        store.add(entries)?;
        log::info!("Ingested {total} units. Store size: {}", store.len());
        Ok(total)
    }
}
