use crate::error::{InvokeError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

pub const JSON_MIME: &str = "application/json";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const ERROR_BODY_LIMIT: usize = 512;

/// A single model invocation: target model plus its JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model_id: String,
    pub body: Value,
    pub accept: String,
    pub content_type: String,
}

impl ModelRequest {
    pub fn json(model_id: impl Into<String>, body: Value) -> Self {
        Self {
            model_id: model_id.into(),
            body,
            accept: JSON_MIME.to_string(),
            content_type: JSON_MIME.to_string(),
        }
    }
}

/// Anything that can turn a [`ModelRequest`] into a JSON response.
///
/// Implementations are shared behind `Arc` across concurrent embedding and
/// generation calls, so they must be `Send + Sync` and hold no per-call state.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpInvokerConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl HttpInvokerConfig {
    /// Default runtime endpoint for a hosted-model region
    pub fn for_region(region: &str) -> Self {
        Self {
            endpoint: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(InvokeError::Config("endpoint cannot be empty".to_string()));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(InvokeError::Config(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.timeout.is_zero() {
            return Err(InvokeError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for HttpInvokerConfig {
    fn default() -> Self {
        Self::for_region(DEFAULT_REGION)
    }
}

/// Invokes hosted models over HTTPS
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    config: HttpInvokerConfig,
    client: Client,
}

impl HttpInvoker {
    pub fn new(config: HttpInvokerConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InvokeError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &HttpInvokerConfig {
        &self.config
    }

    fn url_for(&self, model_id: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.config.endpoint.trim_end_matches('/'),
            encode_model_id(model_id)
        )
    }

    fn map_reqwest_error(&self, err: &reqwest::Error) -> InvokeError {
        if err.is_timeout() {
            InvokeError::Timeout {
                timeout_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            InvokeError::Transport(err.to_string())
        }
    }

    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(&e))?;

        if !status.is_success() {
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        serde_json::from_str(&text).map_err(|e| InvokeError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ModelInvoker for HttpInvoker {
    async fn invoke(&self, request: ModelRequest) -> Result<Value> {
        let url = self.url_for(&request.model_id);
        log::debug!("POST {url}");

        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, &request.accept)
            .header(reqwest::header::CONTENT_TYPE, &request.content_type)
            .json(&request.body);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(&e))?;
        let result = self.handle_response(response).await;
        if let Err(err) = &result {
            log::warn!("Model '{}' invocation failed: {err}", request.model_id);
        }
        result
    }
}

/// Model ids may carry ':' (versions) and '/' (ARNs); both must stay inside one path segment.
fn encode_model_id(model_id: &str) -> String {
    let mut out = String::with_capacity(model_id.len());
    for ch in model_id.chars() {
        match ch {
            ':' => out.push_str("%3A"),
            '/' => out.push_str("%2F"),
            _ => out.push(ch),
        }
    }
    out
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
