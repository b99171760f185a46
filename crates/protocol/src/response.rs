use crate::error::{InvokeError, Result};
use crate::task::ModelFamily;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

/// Extract the generated completion from a text-generation response
pub fn decode_generated_text(family: ModelFamily, body: &Value) -> Result<String> {
    let (path, value) = match family {
        ModelFamily::Llama => ("generation", body.get("generation")),
        ModelFamily::CohereCommand => (
            "generations[0].text",
            first(body, "generations").and_then(|g| g.get("text")),
        ),
        _ => (
            "results[0].outputText",
            first(body, "results").and_then(|r| r.get("outputText")),
        ),
    };
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InvokeError::MissingField(path.to_string()))
}

/// Extract the `embedding` array as `f32`s
pub fn decode_embedding(body: &Value) -> Result<Vec<f32>> {
    let values = body
        .get("embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| InvokeError::MissingField("embedding".to_string()))?;

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| InvokeError::Decode(format!("embedding[{i}] is not a number")))
        })
        .collect()
}

/// Extract and base64-decode the first generated image
pub fn decode_image(family: ModelFamily, body: &Value) -> Result<Vec<u8>> {
    let (path, encoded) = match family {
        ModelFamily::StableDiffusion => (
            "artifacts[0].base64",
            first(body, "artifacts").and_then(|a| a.get("base64")),
        ),
        _ => ("images[0]", first(body, "images")),
    };
    let encoded = encoded
        .and_then(Value::as_str)
        .ok_or_else(|| InvokeError::MissingField(path.to_string()))?;

    BASE64
        .decode(encoded.trim())
        .map_err(|e| InvokeError::Decode(format!("{path}: {e}")))
}

fn first<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key).and_then(Value::as_array).and_then(|a| a.first())
}
