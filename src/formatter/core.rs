use thiserror::Error;

use crate::request::Request;
use crate::response::Response;

/// Errors raised by negotiation and by the codecs themselves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A non-empty body arrived with a `Content-Type` nothing is registered for
    #[error("request format not supported: {content_type}")]
    NoRequestFormat { content_type: String },

    /// Nothing registered satisfies the `Accept` header
    #[error("response format not supported: {accept}")]
    NoResponseFormat { accept: String },

    #[error("failed to decode {mime} body: {reason}")]
    Decode { mime: String, reason: String },

    #[error("failed to encode {mime} body: {reason}")]
    Encode { mime: String, reason: String },

    /// The codec does not handle this payload shape
    #[error("{mime} formatter cannot encode a {payload} payload")]
    Unsupported { mime: String, payload: &'static str },
}

impl FormatError {
    /// HTTP status the dispatcher answers with for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            FormatError::NoRequestFormat { .. } => 415,
            FormatError::NoResponseFormat { .. } => 406,
            FormatError::Decode { .. }
            | FormatError::Encode { .. }
            | FormatError::Unsupported { .. } => 500,
        }
    }
}

/// Decodes a request body into [`Request::data`].
pub trait RequestFormatter: Send + Sync {
    fn mime_type(&self) -> &str;

    /// Read `request.body` and populate `request.data`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Decode`] when the body is malformed.
    fn decode(&self, request: &mut Request) -> Result<(), FormatError>;
}

/// Encodes [`Response::data`] into [`Response::body`].
pub trait ResponseFormatter: Send + Sync {
    fn mime_type(&self) -> &str;

    /// Serialize `response.data` into `response.body`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Encode`] or [`FormatError::Unsupported`] when the
    /// payload cannot be represented in this format.
    fn encode(&self, response: &mut Response) -> Result<(), FormatError>;
}

/// Media type of a header value: parameters dropped, trimmed, lowercased.
///
/// `"Application/JSON; charset=utf-8"` becomes `"application/json"`.
#[must_use]
pub fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_normalization() {
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type("  text/plain  "), "text/plain");
        assert_eq!(media_type(""), "");
    }

    #[test]
    fn test_error_statuses() {
        let e = FormatError::NoRequestFormat {
            content_type: "text/xml".into(),
        };
        assert_eq!(e.status(), 415);
        let e = FormatError::NoResponseFormat {
            accept: "text/xml".into(),
        };
        assert_eq!(e.status(), 406);
        let e = FormatError::Unsupported {
            mime: "text/plain".into(),
            payload: "structured value",
        };
        assert_eq!(e.status(), 500);
        assert_eq!(
            e.to_string(),
            "text/plain formatter cannot encode a structured value payload"
        );
    }
}
