use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use ragline_protocol::{
    HttpInvoker, HttpInvokerConfig, InvokeError, ModelClient, ModelInvoker, ModelTask,
    SamplingParams,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn invoke(
    Path(model_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    match model_id.as_str() {
        "amazon.titan-text-express-v1" => {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let prompt = body["inputText"].as_str().unwrap_or_default();
            let reply = json!({
                "results": [{ "outputText": format!("{prompt} | {auth}") }]
            });
            (StatusCode::OK, reply.to_string())
        }
        "us.meta.llama3-8b-instruct-v1:0" => (
            StatusCode::OK,
            json!({ "generation": "versioned id ok" }).to_string(),
        ),
        "amazon.titan-embed-text-v1" => (StatusCode::OK, "not json".to_string()),
        "cohere.command-text-v14" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, "{}".to_string())
        }
        _ => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "message": "Too many requests" }).to_string(),
        ),
    }
}

async fn spawn_server() -> String {
    let app = Router::new().route("/model/:model_id/invoke", post(invoke));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn invoker(endpoint: &str, timeout: Duration) -> HttpInvoker {
    HttpInvoker::new(
        HttpInvokerConfig::default()
            .with_endpoint(endpoint)
            .with_api_token(Some("secret".to_string()))
            .with_timeout(timeout),
    )
    .unwrap()
}

#[tokio::test]
async fn generates_text_over_http_with_bearer_auth() {
    let endpoint = spawn_server().await;
    let client = ModelClient::new(Arc::new(invoker(&endpoint, Duration::from_secs(5))));

    let text = client
        .generate_text(
            "amazon.titan-text-express-v1",
            "ping",
            &SamplingParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(text, "ping | Bearer secret");
}

#[tokio::test]
async fn model_ids_with_colons_are_routed() {
    let endpoint = spawn_server().await;
    let client = ModelClient::new(Arc::new(invoker(&endpoint, Duration::from_secs(5))));

    let text = client
        .generate_text(
            "us.meta.llama3-8b-instruct-v1:0",
            "ping",
            &SamplingParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(text, "versioned id ok");
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let endpoint = spawn_server().await;
    let invoker = invoker(&endpoint, Duration::from_secs(5));
    let request = ModelTask::TextEmbed { text: "x".into() }
        .into_request("amazon.titan-embed-image-v1")
        .unwrap_err();
    assert!(matches!(request, InvokeError::UnsupportedTask { .. }));

    let request = ModelTask::ImageEmbed { image: vec![1] }
        .into_request("amazon.titan-embed-image-v1")
        .unwrap();
    let err = invoker.invoke(request).await.unwrap_err();
    match err {
        InvokeError::Status { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("Too many requests"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let endpoint = spawn_server().await;
    let invoker = invoker(&endpoint, Duration::from_secs(5));
    let request = ModelTask::TextEmbed { text: "x".into() }
        .into_request("amazon.titan-embed-text-v1")
        .unwrap();
    let err = invoker.invoke(request).await.unwrap_err();
    assert!(matches!(err, InvokeError::Decode(_)));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let endpoint = spawn_server().await;
    let invoker = invoker(&endpoint, Duration::from_millis(200));
    let request = ModelTask::TextGenerate {
        prompt: "slow".into(),
        params: SamplingParams::default(),
    }
    .into_request("cohere.command-text-v14")
    .unwrap();
    let err = invoker.invoke(request).await.unwrap_err();
    assert!(matches!(err, InvokeError::Timeout { timeout_ms: 200 }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let invoker = invoker(&format!("http://{addr}"), Duration::from_secs(2));
    let request = ModelTask::TextEmbed { text: "x".into() }
        .into_request("amazon.titan-embed-text-v1")
        .unwrap();
    let err = invoker.invoke(request).await.unwrap_err();
    assert!(err.is_transport(), "{err:?}");
}
