use crate::handlers::{HandlerRequest, HandlerResponse, Handlers};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{Response as HttpResponse, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn router(handlers: Handlers) -> Router {
    Router::new()
        .route("/summarize", post(summarize))
        .route("/image", post(image))
        .route("/health", get(health))
        .with_state(Arc::new(handlers))
}

/// Missing body → empty request; malformed JSON → `None` (rejected as invalid)
fn parse_body(body: &Bytes) -> Option<HandlerRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(HandlerRequest::default());
    }
    match serde_json::from_slice(body) {
        Ok(request) => Some(request),
        Err(err) => {
            log::warn!("Rejected malformed request body: {err}");
            None
        }
    }
}

fn invalid_request() -> Response {
    build_response(
        StatusCode::BAD_REQUEST,
        &json!({ "message": crate::handlers::INVALID_REQUEST }),
    )
}

async fn summarize(
    State(handlers): State<Arc<Handlers>>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(mut request) = parse_body(&body) else {
        return invalid_request();
    };
    if let Some(raw) = query.get("points") {
        match raw.trim().parse() {
            Ok(points) => request.points = Some(points),
            Err(_) => return invalid_request(),
        }
    }
    into_response(handlers.summarize(&request).await)
}

async fn image(State(handlers): State<Arc<Handlers>>, body: Bytes) -> Response {
    let Some(request) = parse_body(&body) else {
        return invalid_request();
    };
    into_response(handlers.generate_image(&request).await)
}

async fn health() -> Response {
    build_response(StatusCode::OK, &json!({ "status": "ok" }))
}

fn into_response(response: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    build_response(status, &response.body)
}

fn build_response(status: StatusCode, body: &serde_json::Value) -> Response {
    HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid HTTP response")
}
