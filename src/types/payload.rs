//! Request body assembly and response decoding
//!
//! The request body is an ordered merge of flat JSON maps. Later layers win
//! on key collision:
//!
//! 1. `prompt`
//! 2. sampling parameters
//! 3. `stream: true` (streaming calls only)
//! 4. caller overrides

use crate::errors::{ClientError, Result};
use crate::types::SamplingParams;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Build the JSON body for a `/generate` request
pub fn build_payload(
    prompt: &str,
    params: &SamplingParams,
    stream: bool,
    extra: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("prompt".to_string(), Value::String(prompt.to_string()));
    payload.extend(params.to_map());

    if stream {
        payload.insert("stream".to_string(), Value::Bool(true));
    }

    if let Some(extra) = extra {
        payload.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    payload
}

/// Server response body, in both blocking and streaming modes
#[derive(Debug, Deserialize)]
struct TextResponse {
    text: Vec<String>,
}

/// Extract the `text` array from a decoded response document
pub fn decode_text(value: Value) -> Result<Vec<String>> {
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ClientError::Decode(format!(
                "Invalid server response (not a JSON object): {}",
                truncate(&other.to_string())
            )))
        }
    };

    match object.get("text") {
        None => Err(ClientError::Decode(
            "Invalid server response (does not have a \"text\" item)".to_string(),
        )),
        Some(Value::Array(_)) => {
            let response: TextResponse = serde_json::from_value(Value::Object(object))
                .map_err(|e| ClientError::Decode(format!("Invalid \"text\" item: {}", e)))?;
            Ok(response.text)
        }
        Some(_) => Err(ClientError::Decode(
            "Invalid server response (\"text\" item is not an array)".to_string(),
        )),
    }
}

/// Decode a raw JSON document and extract its `text` array
pub fn decode_text_bytes(bytes: &[u8]) -> Result<Vec<String>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ClientError::Decode(format!("Malformed JSON: {}", e)))?;
    decode_text(value)
}

fn truncate(s: &str) -> String {
    const MAX: usize = 200;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
