use crate::error::{ChainError, Result};
use crate::generation::GenerationChain;
use crate::prompt::{PromptTemplate, PromptVariables};
use crate::retriever::Retriever;
use crate::templates;
use ragline_text_chunker::Chunker;
use ragline_vector_store::{
    ContentUnit, EmbeddingProvider, Ingestor, RetrievalResult, VectorStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Generated answer plus the context it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub text: String,
    pub context: Vec<RetrievalResult>,
}

impl RagAnswer {
    pub fn context_texts(&self) -> Vec<&str> {
        self.context.iter().filter_map(|hit| hit.unit.as_text()).collect()
    }
}

/// Chunk → embed → store on the way in; retrieve → compose → generate on the way out
pub struct RagPipeline {
    chunker: Chunker,
    ingestor: Ingestor,
    retriever: Retriever,
    generation: GenerationChain,
    template: PromptTemplate,
}

impl RagPipeline {
    pub fn new(
        chunker: Chunker,
        provider: Arc<dyn EmbeddingProvider>,
        generation: GenerationChain,
        k: usize,
    ) -> Result<Self> {
        let store = Arc::new(VectorStore::for_model(provider.model_id()));
        let retriever = Retriever::new(store, Arc::clone(&provider), k)?;
        Ok(Self {
            chunker,
            ingestor: Ingestor::new(provider),
            retriever,
            generation,
            template: templates::rag_answer(),
        })
    }

    /// Answer with a different template; it must use `{context}` and `{input}`
    pub fn with_template(mut self, template: PromptTemplate) -> Result<Self> {
        let names = template.placeholders()?;
        for required in ["context", "input"] {
            if !names.iter().any(|n| n == required) {
                return Err(ChainError::InvalidTemplate(format!(
                    "answer template must use '{{{required}}}'"
                )));
            }
        }
        self.template = template;
        Ok(self)
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.ingestor = self.ingestor.with_concurrency(concurrency);
        self
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        self.retriever.store()
    }

    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Chunk a document and index its non-blank chunks; returns the number indexed
    pub async fn ingest_document(&self, document: &str, source: Option<&str>) -> Result<usize> {
        let chunks: Vec<_> = self
            .chunker
            .split_document(document, source)
            .into_iter()
            .filter(|chunk| !chunk.is_blank())
            .collect();
        let tokens: usize = chunks.iter().map(|chunk| chunk.estimated_tokens()).sum();
        log::debug!(
            "Embedding {} chunks (~{tokens} tokens) from {}",
            chunks.len(),
            source.unwrap_or("<inline>")
        );
        let units: Vec<ContentUnit> = chunks.into_iter().map(ContentUnit::from).collect();
        Ok(self.ingestor.ingest(self.store(), units).await?)
    }

    pub async fn ingest_documents<S: AsRef<str>>(&self, documents: &[S]) -> Result<usize> {
        let mut total = 0;
        for document in documents {
            total += self.ingest_document(document.as_ref(), None).await?;
        }
        Ok(total)
    }

    /// Index each fact as its own unit, without chunking
    pub async fn ingest_facts<I, S>(&self, facts: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let units: Vec<ContentUnit> = facts
            .into_iter()
            .map(Into::<String>::into)
            .filter(|fact| !fact.trim().is_empty())
            .map(ContentUnit::text)
            .collect();
        Ok(self.ingestor.ingest(self.store(), units).await?)
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let context = self.retriever.retrieve_scored(question).await?;
        let texts: Vec<String> = context
            .iter()
            .filter_map(|hit| hit.unit.as_text().map(str::to_string))
            .collect();
        let vars = PromptVariables::new()
            .with("context", texts)
            .with("input", question);
        let text = self.generation.invoke(&self.template, &vars).await?;
        Ok(RagAnswer { text, context })
    }
}
