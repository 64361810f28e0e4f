use serde_json::Value;

use super::core::{FormatError, RequestFormatter, ResponseFormatter};
use crate::request::Request;
use crate::response::{Payload, Response};

pub const TEXT: &str = "text/plain";

/// `text/plain` pass-through codec.
///
/// Only strings and byte sequences encode; structured payloads fail with
/// [`FormatError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl RequestFormatter for TextFormatter {
    fn mime_type(&self) -> &str {
        TEXT
    }

    fn decode(&self, request: &mut Request) -> Result<(), FormatError> {
        let text = std::str::from_utf8(&request.body).map_err(|e| FormatError::Decode {
            mime: TEXT.to_string(),
            reason: e.to_string(),
        })?;
        request
            .data
            .insert("body".to_string(), Value::String(text.to_string()));
        Ok(())
    }
}

impl ResponseFormatter for TextFormatter {
    fn mime_type(&self) -> &str {
        TEXT
    }

    fn encode(&self, response: &mut Response) -> Result<(), FormatError> {
        response.body = match &response.data {
            Payload::Empty => Vec::new(),
            Payload::Text(text) | Payload::Value(Value::String(text)) => text.as_bytes().to_vec(),
            Payload::Bytes(bytes) => bytes.clone(),
            other => {
                return Err(FormatError::Unsupported {
                    mime: TEXT.to_string(),
                    payload: other.kind(),
                })
            }
        };
        Ok(())
    }
}
