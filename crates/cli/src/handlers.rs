use ragline_chain::{templates, ChainError, GenerationChain, PromptVariables, SamplingParams};
use ragline_protocol::{ImageGeneration, InvokeError, ModelClient, ModelInvoker, ObjectStore};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const INVALID_REQUEST: &str = "Invalid request";

/// Incoming request body. `points` may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HandlerRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "points_from_any")]
    pub points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: Value,
}

impl HandlerResponse {
    fn ok(body: Value) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    fn invalid() -> Self {
        Self {
            status_code: 400,
            body: json!({ "message": INVALID_REQUEST }),
        }
    }

    fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: json!({ "message": message.into() }),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

fn points_from_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("points must be an integer, got '{s}'"))),
    }
}

/// Model failures become 502 when the endpoint itself failed; a response
/// without the expected output is reported as an invalid request.
fn model_failure(operation: &str, err: &InvokeError) -> HandlerResponse {
    log::warn!("{operation} failed: {err}");
    if err.is_transport() {
        HandlerResponse::error(502, err.to_string())
    } else {
        match err {
            InvokeError::MissingField(_) | InvokeError::Decode(_) => HandlerResponse::invalid(),
            _ => HandlerResponse::error(500, err.to_string()),
        }
    }
}

/// Request handlers for the summarize and image endpoints
#[derive(Clone)]
pub struct Handlers {
    summarizer: GenerationChain,
    client: ModelClient,
    objects: Arc<dyn ObjectStore>,
    image_model: String,
    bucket: String,
    url_ttl_secs: u64,
}

impl Handlers {
    pub fn new(
        invoker: Arc<dyn ModelInvoker>,
        objects: Arc<dyn ObjectStore>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            summarizer: GenerationChain::new(
                Arc::clone(&invoker),
                text_model,
                SamplingParams::deterministic(),
            ),
            client: ModelClient::new(invoker),
            objects,
            image_model: image_model.into(),
            bucket: "ragline-images".to_string(),
            url_ttl_secs: 3600,
        }
    }

    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    #[must_use]
    pub const fn with_url_ttl(mut self, ttl_secs: u64) -> Self {
        self.url_ttl_secs = ttl_secs;
        self
    }

    /// `{text, points}` → `{summary}`
    pub async fn summarize(&self, request: &HandlerRequest) -> HandlerResponse {
        let text = request.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let (Some(text), Some(points)) = (text, request.points.filter(|p| *p > 0)) else {
            log::warn!("Rejected summarize request without text/points");
            return HandlerResponse::invalid();
        };

        let vars = PromptVariables::new()
            .with("text", text)
            .with("points", points.to_string());
        match self.summarizer.invoke(&templates::summarize_points(), &vars).await {
            Ok(summary) => HandlerResponse::ok(json!({ "summary": summary })),
            Err(ChainError::Generation(err)) => model_failure("Summarize", &err),
            Err(err) => {
                log::warn!("Summarize failed: {err}");
                HandlerResponse::invalid()
            }
        }
    }

    /// `{description}` → `{url}` of the stored image
    pub async fn generate_image(&self, request: &HandlerRequest) -> HandlerResponse {
        let Some(description) = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        else {
            log::warn!("Rejected image request without description");
            return HandlerResponse::invalid();
        };

        let image = match self
            .client
            .generate_image(&self.image_model, ImageGeneration::text_to_image(description))
            .await
        {
            Ok(image) => image,
            Err(err) => return model_failure("Image generation", &err),
        };

        let key = format!("{}.jpg", unix_millis());
        let stored = async {
            self.objects.put(&self.bucket, &key, &image).await?;
            self.objects
                .signed_url(&self.bucket, &key, self.url_ttl_secs)
                .await
        };
        match stored.await {
            Ok(url) => {
                log::info!("Stored generated image {}/{key}", self.bucket);
                HandlerResponse::ok(json!({ "url": url }))
            }
            Err(err) => {
                log::warn!("Storing generated image failed: {err}");
                HandlerResponse::error(500, err.to_string())
            }
        }
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use ragline_protocol::{LocalObjectStore, ModelRequest, StubInvoker, STUB_PNG};

    const TITAN_TEXT: &str = "amazon.titan-text-express-v1";
    const TITAN_IMAGE: &str = "amazon.titan-image-generator-v1";

    fn handlers(invoker: Arc<dyn ModelInvoker>, root: &std::path::Path) -> Handlers {
        Handlers::new(
            invoker,
            Arc::new(LocalObjectStore::new(root)),
            TITAN_TEXT,
            TITAN_IMAGE,
        )
        .with_bucket("images")
    }

    fn request(body: Value) -> HandlerRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn summarize_renders_points_prompt_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubInvoker::default());
        let handlers = handlers(stub.clone(), dir.path());

        let response = handlers
            .summarize(&request(json!({ "text": "A long story.", "points": "3" })))
            .await;

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.body["summary"],
            "Text: A long story.\n From the text above, summarize the story in 3 points."
        );
        let sent = &stub.requests()[0].body["textGenerationConfig"];
        assert_eq!(sent["temperature"], json!(0.0));
        assert_eq!(sent["topP"], json!(1.0));
    }

    #[tokio::test]
    async fn summarize_without_fields_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubInvoker::default());
        let handlers = handlers(stub.clone(), dir.path());

        for body in [
            json!({ "text": "story" }),
            json!({ "points": 2 }),
            json!({ "text": "   ", "points": 2 }),
            json!({ "text": "story", "points": 0 }),
        ] {
            let response = handlers.summarize(&request(body)).await;
            assert_eq!(response.status_code, 400);
            assert_eq!(response.body, json!({ "message": "Invalid request" }));
        }
        assert!(stub.requests().is_empty());
    }

    #[test]
    fn non_numeric_points_fail_to_parse() {
        let parsed: Result<HandlerRequest, _> =
            serde_json::from_value(json!({ "text": "t", "points": "many" }));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn image_is_stored_and_signed() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubInvoker::default());
        let handlers = handlers(stub.clone(), dir.path()).with_url_ttl(60);

        let response = handlers
            .generate_image(&request(json!({ "description": "a red bicycle" })))
            .await;

        assert!(response.is_success(), "{response:?}");
        let url = response.body["url"].as_str().unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.contains("/images/"));
        assert!(url.contains(".jpg?expires="));

        let stored: Vec<_> = std::fs::read_dir(dir.path().join("images"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(std::fs::read(&stored[0]).unwrap(), STUB_PNG);

        let body = &stub.requests()[0].body;
        assert_eq!(body["taskType"], "TEXT_IMAGE");
        assert_eq!(body["textToImageParams"]["text"], "a red bicycle");
        assert_eq!(body["imageGenerationConfig"]["cfgScale"], json!(8.0));
    }

    #[tokio::test]
    async fn image_without_description_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(Arc::new(StubInvoker::default()), dir.path());
        let response = handlers.generate_image(&HandlerRequest::default()).await;
        assert_eq!(response.status_code, 400);
    }

    struct Unreachable;

    #[async_trait]
    impl ModelInvoker for Unreachable {
        async fn invoke(&self, _request: ModelRequest) -> ragline_protocol::Result<Value> {
            Err(InvokeError::Transport("connection refused".into()))
        }
    }

    struct Empty;

    #[async_trait]
    impl ModelInvoker for Empty {
        async fn invoke(&self, _request: ModelRequest) -> ragline_protocol::Result<Value> {
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn transport_failures_map_to_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(Arc::new(Unreachable), dir.path());

        let response = handlers
            .summarize(&request(json!({ "text": "story", "points": 2 })))
            .await;
        assert_eq!(response.status_code, 502);
        assert!(response.body["message"]
            .as_str()
            .unwrap()
            .contains("connection refused"));

        let response = handlers
            .generate_image(&request(json!({ "description": "cat" })))
            .await;
        assert_eq!(response.status_code, 502);
    }

    #[tokio::test]
    async fn missing_output_field_is_an_invalid_request() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(Arc::new(Empty), dir.path());

        let response = handlers
            .summarize(&request(json!({ "text": "story", "points": 2 })))
            .await;
        assert_eq!(response.status_code, 400);

        let response = handlers
            .generate_image(&request(json!({ "description": "cat" })))
            .await;
        assert_eq!(response, HandlerResponse::invalid());
    }
}
