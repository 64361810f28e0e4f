use super::core::{FormatError, RequestFormatter, ResponseFormatter};
use crate::request::Request;
use crate::response::Response;

/// No-op codec for exchanges without a body.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFormatter;

impl RequestFormatter for NullFormatter {
    fn mime_type(&self) -> &str {
        ""
    }

    fn decode(&self, _request: &mut Request) -> Result<(), FormatError> {
        Ok(())
    }
}

impl ResponseFormatter for NullFormatter {
    fn mime_type(&self) -> &str {
        ""
    }

    fn encode(&self, _response: &mut Response) -> Result<(), FormatError> {
        Ok(())
    }
}
