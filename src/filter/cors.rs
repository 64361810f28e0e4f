use http::Method;
use tracing::debug;

use super::Filter;
use crate::request::Request;
use crate::response::Response;

pub const DEFAULT_ALLOW_ORIGIN: &str = "*";
pub const DEFAULT_ALLOW_HEADERS: &str = "Accept,Authorization,Origin,Content-type,X-Requested-With";
pub const DEFAULT_ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

/// Permissive CORS filter.
///
/// Answers `OPTIONS` preflights with 204 in the pre phase and stamps the
/// `Access-Control-Allow-*` headers on every response in the post phase,
/// unless the handler already set an allowed origin.
///
/// # Example
///
/// ```
/// use webdispatch::filter::CorsFilter;
///
/// let cors = CorsFilter::new()
///     .allow_origin("https://app.example.com")
///     .allow_methods("GET,POST");
/// # let _ = cors;
/// ```
#[derive(Debug, Clone)]
pub struct CorsFilter {
    allow_origin: String,
    allow_headers: String,
    allow_methods: String,
    max_age: Option<u32>,
}

impl Default for CorsFilter {
    fn default() -> Self {
        Self {
            allow_origin: DEFAULT_ALLOW_ORIGIN.to_string(),
            allow_headers: DEFAULT_ALLOW_HEADERS.to_string(),
            allow_methods: DEFAULT_ALLOW_METHODS.to_string(),
            max_age: None,
        }
    }
}

impl CorsFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    #[must_use]
    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.allow_methods = methods.into();
        self
    }

    /// Preflight cache lifetime in seconds
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn stamp(&self, response: &mut Response) {
        response.add_header("access-control-allow-origin", self.allow_origin.as_str());
        response.add_header("access-control-allow-headers", self.allow_headers.as_str());
        response.add_header("access-control-allow-methods", self.allow_methods.as_str());
        if let Some(age) = self.max_age {
            response.add_header("access-control-max-age", age.to_string());
        }
    }
}

impl Filter for CorsFilter {
    fn filter(&self, request: &mut Request, response: Option<&mut Response>) -> Option<Response> {
        match response {
            None if request.method == Method::OPTIONS => {
                debug!(path = %request.path, "CORS preflight");
                let mut preflight = Response::new(204);
                self.stamp(&mut preflight);
                Some(preflight)
            }
            None => None,
            Some(response) => {
                if response.get_header("access-control-allow-origin").is_none() {
                    self.stamp(response);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_answered() {
        let mut req = Request::new(Method::OPTIONS, "/rest/1");
        let res = CorsFilter::new().filter(&mut req, None).unwrap();
        assert_eq!(res.status, 204);
        assert_eq!(res.get_header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.get_header("access-control-allow-methods"),
            Some(DEFAULT_ALLOW_METHODS)
        );
    }

    #[test]
    fn test_non_preflight_passes_and_is_stamped() {
        let cors = CorsFilter::new().allow_origin("https://a.example").max_age(600);
        let mut req = Request::new(Method::GET, "/");
        assert!(cors.filter(&mut req, None).is_none());

        let mut res = Response::new(200);
        assert!(cors.filter(&mut req, Some(&mut res)).is_none());
        assert_eq!(res.get_header("access-control-allow-origin"), Some("https://a.example"));
        assert_eq!(res.get_header("access-control-max-age"), Some("600"));
    }

    #[test]
    fn test_handler_origin_kept() {
        let mut req = Request::new(Method::GET, "/");
        let mut res = Response::new(200).with_header("Access-Control-Allow-Origin", "https://own");
        CorsFilter::new().filter(&mut req, Some(&mut res));
        assert_eq!(res.get_header("access-control-allow-origin"), Some("https://own"));
        assert_eq!(res.get_header("access-control-allow-headers"), None);
    }
}
