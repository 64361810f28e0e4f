//! Outgoing response model.
//!
//! A [`Response`] carries its pre-encoding value in [`Response::data`] until a
//! response formatter fills [`Response::body`]. Headers are a multimap: adding
//! a header never replaces an existing value of the same name.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::request::HeaderVec;

/// Pre-encoding value of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body; encoded with the null formatter
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Value(Value),
    /// A handler value whose `Serialize` impl failed; never encodable
    Unencodable(String),
}

impl Payload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Short name of the variant, used in encode errors and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Text(_) => "text",
            Payload::Bytes(_) => "bytes",
            Payload::Value(Value::String(_)) => "string value",
            Payload::Value(_) => "structured value",
            Payload::Unencodable(_) => "unencodable value",
        }
    }
}

/// A response produced by a handler, a filter or the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    /// Media type the body was encoded with, set by the dispatcher
    pub format: Option<String>,
    pub data: Payload,
    /// Encoded bytes; an empty body with a non-empty payload means "not encoded yet"
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            format: None,
            data: Payload::Empty,
            body: Vec::new(),
        }
    }

    /// Response carrying any serializable value.
    ///
    /// Serialization happens here so the encode step only sees a
    /// [`serde_json::Value`]; a failing `Serialize` impl yields a payload that
    /// the dispatcher reports as an encode failure (500).
    #[must_use]
    pub fn with_data<T: Serialize>(status: u16, data: &T) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(value) => Payload::Value(value),
            Err(e) => Payload::Unencodable(e.to_string()),
        };
        Self {
            data,
            ..Self::new(status)
        }
    }

    #[must_use]
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            data: Payload::Value(value),
            ..Self::new(status)
        }
    }

    #[must_use]
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            data: Payload::Text(text.into()),
            ..Self::new(status)
        }
    }

    /// Error response with body `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// Append a header; the name is lowercased.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
    }

    /// Builder form of [`Response::add_header`].
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// First value of a header, matched case-insensitively.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True once a formatter has produced bytes, or when there is nothing to encode.
    #[must_use]
    pub fn is_encoded(&self) -> bool {
        !self.body.is_empty() || self.data.is_empty()
    }

    /// Convert into a transport response.
    ///
    /// `Content-Type` is taken from [`Response::format`] when set, replacing
    /// any `Content-Type` in [`Response::headers`]. Header pairs that are not
    /// valid HTTP are skipped with a warning.
    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let status = http::StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            warn!(status = self.status, "Invalid status code, sending 500");
            http::StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut out = http::Response::new(self.body);
        *out.status_mut() = status;

        let headers = out.headers_mut();
        for (name, value) in &self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid response header"),
            }
        }
        if let Some(format) = self.format.as_deref() {
            if let Ok(value) = http::HeaderValue::from_str(format) {
                headers.insert(http::header::CONTENT_TYPE, value);
            }
        }
        out
    }
}
