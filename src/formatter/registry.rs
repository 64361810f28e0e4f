use std::sync::Arc;

use tracing::debug;

use super::core::{media_type, FormatError, RequestFormatter, ResponseFormatter};
use super::json::{JsonFormatter, JSON};
use super::text::{TextFormatter, TEXT};

/// Request and response formatters keyed by media type, in registration order.
///
/// Keys are stored lowercased. Registering an existing key replaces the
/// formatter in place, keeping its original position for fallback purposes.
#[derive(Clone)]
pub struct FormatterRegistry {
    requests: Vec<(String, Arc<dyn RequestFormatter>)>,
    responses: Vec<(String, Arc<dyn ResponseFormatter>)>,
}

impl Default for FormatterRegistry {
    /// JSON first, then plain text, in both directions.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.add(JSON, Some(Arc::new(JsonFormatter)), Some(Arc::new(JsonFormatter)));
        registry.add(TEXT, Some(Arc::new(TextFormatter)), Some(Arc::new(TextFormatter)));
        registry
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("requests", &self.request_types().collect::<Vec<_>>())
            .field("responses", &self.response_types().collect::<Vec<_>>())
            .finish()
    }
}

impl FormatterRegistry {
    /// Registry with no formatters at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            requests: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Register a codec pair; either side may be omitted.
    pub fn add(
        &mut self,
        mime: &str,
        request: Option<Arc<dyn RequestFormatter>>,
        response: Option<Arc<dyn ResponseFormatter>>,
    ) {
        if let Some(request) = request {
            self.add_request(mime, request);
        }
        if let Some(response) = response {
            self.add_response(mime, response);
        }
    }

    pub fn add_request(&mut self, mime: &str, formatter: Arc<dyn RequestFormatter>) {
        upsert(&mut self.requests, media_type(mime), formatter);
    }

    pub fn add_response(&mut self, mime: &str, formatter: Arc<dyn ResponseFormatter>) {
        upsert(&mut self.responses, media_type(mime), formatter);
    }

    /// Remove every request and response formatter.
    pub fn clear(&mut self) {
        self.requests.clear();
        self.responses.clear();
    }

    #[must_use]
    pub fn request_formatter(&self, mime: &str) -> Option<&Arc<dyn RequestFormatter>> {
        let key = media_type(mime);
        self.requests.iter().find(|(k, _)| *k == key).map(|(_, f)| f)
    }

    #[must_use]
    pub fn response_formatter(&self, mime: &str) -> Option<&Arc<dyn ResponseFormatter>> {
        let key = media_type(mime);
        self.responses.iter().find(|(k, _)| *k == key).map(|(_, f)| f)
    }

    pub fn request_types(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(|(k, _)| k.as_str())
    }

    pub fn response_types(&self) -> impl Iterator<Item = &str> {
        self.responses.iter().map(|(k, _)| k.as_str())
    }

    /// Select the request formatter for a `Content-Type` header value.
    ///
    /// An absent or blank header falls back to the first registered formatter.
    ///
    /// # Errors
    ///
    /// [`FormatError::NoRequestFormat`] when the media type is not registered,
    /// or when the registry has no request formatters at all.
    pub fn negotiate_request(
        &self,
        content_type: Option<&str>,
    ) -> Result<(&str, &Arc<dyn RequestFormatter>), FormatError> {
        let wanted = content_type.map(media_type).filter(|m| !m.is_empty());
        let found = match &wanted {
            None => self.requests.first(),
            Some(mime) => self.requests.iter().find(|(k, _)| k == mime),
        };
        match found {
            Some((mime, formatter)) => Ok((mime.as_str(), formatter)),
            None => {
                debug!(content_type = ?content_type, "No request formatter matched");
                Err(FormatError::NoRequestFormat {
                    content_type: wanted.unwrap_or_default(),
                })
            }
        }
    }

    /// Select the response formatter for an `Accept` header value.
    ///
    /// Entries are tried in listed order, quality parameters ignored; the first
    /// entry with a registered formatter wins. `*/*` selects the first
    /// registered formatter and `type/*` the first registered one of that type.
    ///
    /// # Errors
    ///
    /// [`FormatError::NoResponseFormat`] when no listed entry is satisfiable.
    pub fn negotiate_response(
        &self,
        accept: Option<&str>,
    ) -> Result<(&str, &Arc<dyn ResponseFormatter>), FormatError> {
        let accept_value = accept.map(str::trim).unwrap_or_default();

        let found = if accept_value.is_empty() {
            self.responses.first()
        } else {
            accept_value
                .split(',')
                .map(media_type)
                .filter(|m| !m.is_empty())
                .find_map(|wanted| self.match_response(&wanted))
        };

        match found {
            Some((mime, formatter)) => Ok((mime.as_str(), formatter)),
            None => {
                debug!(accept = %accept_value, "No response formatter matched");
                Err(FormatError::NoResponseFormat {
                    accept: accept_value.to_string(),
                })
            }
        }
    }

    fn match_response(&self, wanted: &str) -> Option<&(String, Arc<dyn ResponseFormatter>)> {
        if wanted == "*/*" {
            return self.responses.first();
        }
        if let Some(kind) = wanted.strip_suffix("/*") {
            return self.responses.iter().find(|(k, _)| {
                k.split_once('/')
                    .is_some_and(|(registered_kind, _)| registered_kind == kind)
            });
        }
        self.responses.iter().find(|(k, _)| k == wanted)
    }
}

fn upsert<T: ?Sized>(entries: &mut Vec<(String, Arc<T>)>, key: String, formatter: Arc<T>) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = formatter,
        None => entries.push((key, formatter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::NullFormatter;

    #[test]
    fn test_default_registry_order() {
        let registry = FormatterRegistry::default();
        assert_eq!(
            registry.response_types().collect::<Vec<_>>(),
            vec!["application/json", "text/plain"]
        );
        assert_eq!(registry.request_types().count(), 2);
    }

    #[test]
    fn test_accept_json_selects_json() {
        let registry = FormatterRegistry::default();
        let (mime, f) = registry.negotiate_response(Some("application/json")).unwrap();
        assert_eq!(mime, "application/json");
        assert_eq!(f.mime_type(), "application/json");
    }

    #[test]
    fn test_accept_wildcard_and_absent_fall_back_to_first() {
        let registry = FormatterRegistry::default();
        assert_eq!(registry.negotiate_response(Some("*/*")).unwrap().0, "application/json");
        assert_eq!(registry.negotiate_response(None).unwrap().0, "application/json");
        assert_eq!(registry.negotiate_response(Some("  ")).unwrap().0, "application/json");
    }

    #[test]
    fn test_accept_list_order_and_quality_params() {
        let registry = FormatterRegistry::default();
        let accept = "text/html;q=1.0, Text/Plain;q=0.5, application/json";
        assert_eq!(registry.negotiate_response(Some(accept)).unwrap().0, "text/plain");
    }

    #[test]
    fn test_accept_type_range() {
        let registry = FormatterRegistry::default();
        assert_eq!(registry.negotiate_response(Some("text/*")).unwrap().0, "text/plain");
        assert!(registry.negotiate_response(Some("image/*")).is_err());
    }

    #[test]
    fn test_accept_unsupported_is_406() {
        let registry = FormatterRegistry::default();
        let err = registry.negotiate_response(Some("text/unsupported")).err().unwrap();
        assert_eq!(err.status(), 406);
    }

    #[test]
    fn test_content_type_ignores_parameters() {
        let registry = FormatterRegistry::default();
        let (mime, _) = registry
            .negotiate_request(Some("application/json; charset=utf-8"))
            .unwrap();
        assert_eq!(mime, "application/json");
        let err = registry.negotiate_request(Some("application/xml")).err().unwrap();
        assert_eq!(err.status(), 415);
    }

    #[test]
    fn test_clear_empties_both_maps() {
        let mut registry = FormatterRegistry::default();
        registry.clear();
        assert!(registry.negotiate_request(None).is_err());
        assert!(registry.negotiate_response(None).is_err());
        assert!(registry.negotiate_response(Some("*/*")).is_err());
    }

    #[test]
    fn test_response_only_registration_replaces_in_place() {
        let mut registry = FormatterRegistry::default();
        registry.add_response("APPLICATION/JSON", Arc::new(NullFormatter));
        registry.add("application/x-empty", None, Some(Arc::new(NullFormatter)));

        assert_eq!(
            registry.response_types().collect::<Vec<_>>(),
            vec!["application/json", "text/plain", "application/x-empty"]
        );
        assert!(registry.request_formatter("application/x-empty").is_none());
        assert_eq!(
            registry
                .response_formatter("application/json")
                .map(|f| f.mime_type().to_string()),
            Some(String::new())
        );
    }
}
