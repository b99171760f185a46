use crate::error::{InvokeError, Result};
use crate::invoker::ModelInvoker;
use crate::response::{decode_embedding, decode_generated_text, decode_image};
use crate::task::{ImageGeneration, ModelFamily, ModelTask, SamplingParams, TaskKind};
use std::sync::Arc;

/// Decoded result of a [`ModelTask`]
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Text(String),
    Embedding(Vec<f32>),
    Image(Vec<u8>),
}

/// Typed front end over a shared [`ModelInvoker`]: shapes the request for the
/// model family, invokes it, and decodes the family-specific response.
#[derive(Clone)]
pub struct ModelClient {
    invoker: Arc<dyn ModelInvoker>,
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient").finish_non_exhaustive()
    }
}

impl ModelClient {
    pub fn new(invoker: Arc<dyn ModelInvoker>) -> Self {
        Self { invoker }
    }

    #[must_use]
    pub fn invoker(&self) -> Arc<dyn ModelInvoker> {
        Arc::clone(&self.invoker)
    }

    pub async fn run(&self, model_id: &str, task: ModelTask) -> Result<TaskOutput> {
        let kind = task.kind();
        let request = task.into_request(model_id)?;
        let family = ModelFamily::require(model_id)?;
        let body = self.invoker.invoke(request).await?;

        match kind {
            TaskKind::TextGenerate => decode_generated_text(family, &body).map(TaskOutput::Text),
            TaskKind::TextEmbed | TaskKind::ImageEmbed => {
                decode_embedding(&body).map(TaskOutput::Embedding)
            }
            TaskKind::ImageGenerate => decode_image(family, &body).map(TaskOutput::Image),
        }
    }

    pub async fn generate_text(
        &self,
        model_id: &str,
        prompt: impl Into<String>,
        params: &SamplingParams,
    ) -> Result<String> {
        let task = ModelTask::TextGenerate {
            prompt: prompt.into(),
            params: params.clone(),
        };
        match self.run(model_id, task).await? {
            TaskOutput::Text(text) => Ok(text),
            other => Err(unexpected(model_id, &other)),
        }
    }

    pub async fn embed_text(&self, model_id: &str, text: impl Into<String>) -> Result<Vec<f32>> {
        let task = ModelTask::TextEmbed { text: text.into() };
        match self.run(model_id, task).await? {
            TaskOutput::Embedding(values) => Ok(values),
            other => Err(unexpected(model_id, &other)),
        }
    }

    pub async fn embed_image(&self, model_id: &str, image: Vec<u8>) -> Result<Vec<f32>> {
        match self.run(model_id, ModelTask::ImageEmbed { image }).await? {
            TaskOutput::Embedding(values) => Ok(values),
            other => Err(unexpected(model_id, &other)),
        }
    }

    pub async fn generate_image(
        &self,
        model_id: &str,
        generation: ImageGeneration,
    ) -> Result<Vec<u8>> {
        match self
            .run(model_id, ModelTask::ImageGenerate(generation))
            .await?
        {
            TaskOutput::Image(bytes) => Ok(bytes),
            other => Err(unexpected(model_id, &other)),
        }
    }
}

fn unexpected(model_id: &str, output: &TaskOutput) -> InvokeError {
    let got = match output {
        TaskOutput::Text(_) => "text",
        TaskOutput::Embedding(_) => "embedding",
        TaskOutput::Image(_) => "image",
    };
    InvokeError::Decode(format!("model '{model_id}' produced an unexpected {got} output"))
}
