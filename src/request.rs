//! Per-request state carried through dispatch.
//!
//! A [`Request`] is built once per inbound exchange, either from an
//! `http::Request<Vec<u8>>` via [`Request::from_http`] or directly by a test or
//! transport, and is discarded after the response is produced. Nothing in it is
//! shared between requests: matched path parameters live here, not on the route.

use std::net::SocketAddr;
use std::sync::Arc;

use http::Method;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::ids::RequestId;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum number of headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered name/value pairs for path and query parameters.
///
/// Names are `Arc<str>` so route placeholder names can be shared with every
/// match without copying.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Header multimap. Names are stored lowercased, values verbatim, in arrival order.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Peer address of the connection, supplied by the transport through
/// `http::Extensions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// An inbound request as seen by formatters, the router, filters and handlers.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id, taken from `x-request-id` when valid, generated otherwise
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub remote_addr: Option<SocketAddr>,
    /// Raw body bytes as received
    pub body: Vec<u8>,
    /// Decoded body mapping, filled by the request formatter
    pub data: Map<String, Value>,
    /// Path parameters of the matched route, empty until routed
    pub params: ParamVec,
    /// Authenticated user data, empty until an auth filter sets it
    pub user_data: String,
}

impl Request {
    /// Create a request for `method` and `target`.
    ///
    /// `target` may carry a query string (`/items?limit=10`); it is split off
    /// and parsed into [`Request::query_params`].
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_params: query.map(parse_query).unwrap_or_default(),
            headers: HeaderVec::new(),
            remote_addr: None,
            body: Vec::new(),
            data: Map::new(),
            params: ParamVec::new(),
            user_data: String::new(),
        }
    }

    /// Convert a transport request into a dispatch request.
    ///
    /// Header values that are not valid UTF-8 are dropped. The remote address is
    /// read from a [`RemoteAddr`] extension when the transport provides one.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();

        let headers: HeaderVec = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (Arc::from(name.as_str()), v.to_string()))
            })
            .collect();

        let request_id = RequestId::from_header_or_new(
            parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
        );

        Self {
            request_id,
            method: parts.method,
            path: parts.uri.path().to_string(),
            query_params: parts.uri.query().map(parse_query).unwrap_or_default(),
            headers,
            remote_addr: parts.extensions.get::<RemoteAddr>().map(|addr| addr.0),
            body,
            data: Map::new(),
            params: ParamVec::new(),
            user_data: String::new(),
        }
    }

    /// Append a header; the name is lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// First value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path parameter by name.
    ///
    /// Uses "last write wins" semantics when a template repeats a name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter by name, last occurrence wins.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
