use serde_json::Value;

use super::core::{FormatError, RequestFormatter, ResponseFormatter};
use crate::request::Request;
use crate::response::{Payload, Response};

pub const JSON: &str = "application/json";

/// `application/json` codec.
///
/// Decoding stores a top-level object as the request data mapping; any other
/// JSON value is stored under the key `"body"`. Encoding serializes structured
/// and text payloads and passes raw bytes through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl RequestFormatter for JsonFormatter {
    fn mime_type(&self) -> &str {
        JSON
    }

    fn decode(&self, request: &mut Request) -> Result<(), FormatError> {
        if request.body.is_empty() {
            return Ok(());
        }
        let value: Value = serde_json::from_slice(&request.body).map_err(|e| FormatError::Decode {
            mime: JSON.to_string(),
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(map) => request.data = map,
            other => {
                request.data.insert("body".to_string(), other);
            }
        }
        Ok(())
    }
}

impl ResponseFormatter for JsonFormatter {
    fn mime_type(&self) -> &str {
        JSON
    }

    fn encode(&self, response: &mut Response) -> Result<(), FormatError> {
        let encoded = match &response.data {
            Payload::Empty => Ok(Vec::new()),
            Payload::Bytes(bytes) => Ok(bytes.clone()),
            Payload::Text(text) => serde_json::to_vec(text),
            Payload::Value(value) => serde_json::to_vec(value),
            Payload::Unencodable(reason) => {
                return Err(FormatError::Encode {
                    mime: JSON.to_string(),
                    reason: reason.clone(),
                })
            }
        };
        response.body = encoded.map_err(|e| FormatError::Encode {
            mime: JSON.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
