//! Offline model backend.
//!
//! `StubInvoker` answers every task family with deterministic, locally computed
//! payloads shaped exactly like the hosted responses, so the whole pipeline can
//! run without network access or credentials.

use crate::error::{InvokeError, Result};
use crate::invoker::{ModelInvoker, ModelRequest};
use crate::task::{ModelFamily, TaskKind};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_STUB_DIMENSION: usize = 256;

/// Smallest valid PNG: one transparent pixel
pub const STUB_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[derive(Debug)]
pub struct StubInvoker {
    dimension: usize,
    completion: Option<String>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl Default for StubInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

impl StubInvoker {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            completion: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every generation call with `text` instead of echoing the prompt
    #[must_use]
    pub fn with_completion(mut self, text: impl Into<String>) -> Self {
        self.completion = Some(text.into());
        self
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn respond(&self, family: ModelFamily, body: &Value) -> Result<Value> {
        match family.task_kind() {
            TaskKind::TextGenerate => {
                let prompt = body
                    .get("inputText")
                    .or_else(|| body.get("prompt"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| InvokeError::Decode("request carries no prompt".to_string()))?;
                let text = self.completion.clone().unwrap_or_else(|| prompt.to_string());
                Ok(match family {
                    ModelFamily::Llama => json!({ "generation": text, "stop_reason": "stop" }),
                    ModelFamily::CohereCommand => json!({ "generations": [{ "text": text }] }),
                    _ => json!({
                        "inputTextTokenCount": prompt.split_whitespace().count(),
                        "results": [{ "outputText": text, "completionReason": "FINISH" }],
                    }),
                })
            }
            TaskKind::TextEmbed => {
                let text = body
                    .get("inputText")
                    .and_then(Value::as_str)
                    .ok_or_else(|| InvokeError::Decode("request carries no inputText".to_string()))?;
                Ok(json!({ "embedding": stub_text_embedding(text, self.dimension) }))
            }
            TaskKind::ImageEmbed => {
                let image = body
                    .get("inputImage")
                    .and_then(Value::as_str)
                    .ok_or_else(|| InvokeError::Decode("request carries no inputImage".to_string()))?;
                Ok(json!({ "embedding": stub_embedding(image.as_bytes(), self.dimension) }))
            }
            TaskKind::ImageGenerate => {
                let encoded = BASE64.encode(STUB_PNG);
                Ok(match family {
                    ModelFamily::StableDiffusion => {
                        json!({ "artifacts": [{ "base64": encoded, "finishReason": "SUCCESS" }] })
                    }
                    _ => json!({ "images": [encoded] }),
                })
            }
        }
    }
}

#[async_trait]
impl ModelInvoker for StubInvoker {
    async fn invoke(&self, request: ModelRequest) -> Result<Value> {
        let family = ModelFamily::require(&request.model_id)?;
        let response = self.respond(family, &request.body);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        response
    }
}

/// Deterministic unit vector seeded from arbitrary bytes
#[must_use]
pub fn stub_embedding(bytes: &[u8], dimension: usize) -> Vec<f32> {
    let mut state = fnv1a_64(bytes) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let mantissa = ((bits >> 32) as u32) >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

/// Hashed bag-of-words unit vector: texts sharing words point the same way.
///
/// Falls back to [`stub_embedding`] when the text has no words or the
/// buckets cancel out, so the result is never the zero vector.
#[must_use]
pub fn stub_text_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dimension = dimension.max(1);
    let mut vec = vec![0.0f32; dimension];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = fnv1a_64(word.to_lowercase().as_bytes());
        let bucket = (hash % dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vec[bucket] += sign;
    }
    if !normalize(&mut vec) {
        return stub_embedding(text.as_bytes(), dimension);
    }
    vec
}

fn normalize(vec: &mut [f32]) -> bool {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return false;
    }
    for v in vec.iter_mut() {
        *v /= norm;
    }
    true
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
