use crate::error::Result;
use crate::prompt::{ComposedPrompt, PromptTemplate, PromptVariables};
use ragline_protocol::{ModelClient, ModelInvoker, SamplingParams};
use std::sync::Arc;

/// A text-generation model bound to fixed sampling parameters
#[derive(Debug, Clone)]
pub struct GenerationChain {
    client: ModelClient,
    model_id: String,
    params: SamplingParams,
}

impl GenerationChain {
    pub fn new(
        invoker: Arc<dyn ModelInvoker>,
        model_id: impl Into<String>,
        params: SamplingParams,
    ) -> Self {
        Self {
            client: ModelClient::new(invoker),
            model_id: model_id.into(),
            params,
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Same model and transport, different sampling
    #[must_use]
    pub fn with_params(&self, params: SamplingParams) -> Self {
        Self {
            client: self.client.clone(),
            model_id: self.model_id.clone(),
            params,
        }
    }

    pub async fn generate(&self, prompt: &ComposedPrompt) -> Result<String> {
        self.generate_text(&prompt.to_text()).await
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        log::debug!(
            "Generating with '{}' ({} prompt chars)",
            self.model_id,
            prompt.len()
        );
        let text = self
            .client
            .generate_text(&self.model_id, prompt, &self.params)
            .await?;
        Ok(text)
    }

    /// Render `template` with `vars`, then generate
    pub async fn invoke(&self, template: &PromptTemplate, vars: &PromptVariables) -> Result<String> {
        let prompt = template.render(vars)?;
        self.generate(&prompt).await
    }
}
