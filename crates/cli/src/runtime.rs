use crate::config::{ModelMode, RaglineConfig};
use anyhow::{Context as AnyhowContext, Result};
use ragline_chain::{GenerationChain, RagPipeline};
use ragline_protocol::{
    HttpInvoker, HttpInvokerConfig, LocalObjectStore, ModelClient, ModelInvoker, ObjectStore,
    StubInvoker,
};
use ragline_text_chunker::{Chunker, ChunkerConfig};
use ragline_vector_store::{EmbeddingProvider, ModelEmbedder};
use std::sync::Arc;
use std::time::Duration;

/// Clients built once per process from the resolved configuration and shared
/// by every command.
#[derive(Clone)]
pub struct Runtime {
    pub config: RaglineConfig,
    pub invoker: Arc<dyn ModelInvoker>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Runtime {
    pub fn new(config: RaglineConfig) -> Result<Self> {
        let invoker: Arc<dyn ModelInvoker> = match config.mode {
            ModelMode::Stub => {
                log::debug!("Using stub models (dimension {})", config.stub_dimension);
                Arc::new(StubInvoker::new(config.stub_dimension))
            }
            ModelMode::Remote => {
                let endpoint = config.resolved_endpoint();
                if config.api_token.is_none() {
                    log::warn!(
                        "No API token configured (RAGLINE_API_TOKEN); requests to {endpoint} are unauthenticated"
                    );
                }
                let http = HttpInvokerConfig::for_region(&config.region)
                    .with_endpoint(endpoint)
                    .with_api_token(config.api_token.clone())
                    .with_timeout(Duration::from_secs(config.timeout_secs));
                Arc::new(HttpInvoker::new(http).context("Failed to build model client")?)
            }
        };
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.storage.root));
        Ok(Self {
            config,
            invoker,
            objects,
        })
    }

    pub fn client(&self) -> ModelClient {
        ModelClient::new(Arc::clone(&self.invoker))
    }

    pub fn generation(&self) -> GenerationChain {
        GenerationChain::new(
            Arc::clone(&self.invoker),
            self.config.models.text_model.clone(),
            self.config.sampling.clone(),
        )
    }

    pub fn text_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.embedder(&self.config.models.embedding_model)
    }

    pub fn image_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.embedder(&self.config.models.image_embedding_model)
    }

    fn embedder(&self, model_id: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        let embedder = ModelEmbedder::new(self.client(), model_id)
            .with_context(|| format!("Cannot embed with '{model_id}'"))?;
        Ok(Arc::new(embedder))
    }

    pub fn pipeline(&self, chunking: ChunkerConfig, k: usize) -> Result<RagPipeline> {
        let chunker = Chunker::new(chunking).context("Invalid chunking configuration")?;
        let pipeline = RagPipeline::new(chunker, self.text_embedder()?, self.generation(), k)?
            .with_concurrency(self.config.retrieval.concurrency);
        Ok(pipeline)
    }
}
