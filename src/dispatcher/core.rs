use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};

use crate::auth::{Authorizer, UserDataAuthorizer};
use crate::binder::{Binder, DefaultBinder};
use crate::filter::FilterChain;
use crate::formatter::{
    FormatterRegistry, NullFormatter, RequestFormatter, ResponseFormatter, TEXT,
};
use crate::request::Request;
use crate::response::Response;
use crate::router::{RouteError, RouteMatch, Router};

/// Negotiated response codec for one exchange.
type Encoding<'a> = (&'a str, &'a Arc<dyn ResponseFormatter>);

/// Request dispatch pipeline.
///
/// Owns the route table, the formatter registry and the global filter chain.
/// Configuration goes through `&mut self`; [`Dispatcher::handle`] and
/// [`Dispatcher::serve`] take `&self`, so a configured dispatcher can be
/// shared across transport threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use webdispatch::{Dispatcher, Response};
///
/// fn hello(name: String) -> Response {
///     Response::text(200, format!("hello {name}"))
/// }
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .router_mut()
///     .add_route("/hello/{name}")
///     .unwrap()
///     .to_fn(hello);
///
/// let req = http::Request::get("/hello/ada")
///     .header("accept", "text/plain")
///     .body(Vec::new())
///     .unwrap();
/// let res = dispatcher.serve(req);
/// assert_eq!(res.status(), 200);
/// assert_eq!(res.body(), b"hello ada");
/// ```
pub struct Dispatcher {
    router: Router,
    formatters: FormatterRegistry,
    filters: FilterChain,
    binder: Arc<dyn Binder>,
    authorizer: Arc<dyn Authorizer>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("formatters", &self.formatters)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Empty router and filter chain, JSON and plain-text formatters,
    /// [`DefaultBinder`] and [`UserDataAuthorizer`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_router(Router::new())
    }

    #[must_use]
    pub fn with_router(router: Router) -> Self {
        Self {
            router,
            formatters: FormatterRegistry::default(),
            filters: FilterChain::new(),
            binder: Arc::new(DefaultBinder),
            authorizer: Arc::new(UserDataAuthorizer),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    #[must_use]
    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    pub fn formatters_mut(&mut self) -> &mut FormatterRegistry {
        &mut self.formatters
    }

    /// Register (or replace) the codecs for `mime`.
    pub fn add_formatter(
        &mut self,
        mime: &str,
        request: Option<Arc<dyn RequestFormatter>>,
        response: Option<Arc<dyn ResponseFormatter>>,
    ) {
        self.formatters.add(mime, request, response);
    }

    /// Remove every formatter; until new ones are added all requests get 406.
    pub fn clear_formatters(&mut self) {
        self.formatters.clear();
    }

    /// Filters run before the route's own filters in both phases.
    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterChain {
        &mut self.filters
    }

    pub fn set_authorizer(&mut self, authorizer: impl Authorizer + 'static) {
        self.authorizer = Arc::new(authorizer);
    }

    pub fn set_binder(&mut self, binder: impl Binder + 'static) {
        self.binder = Arc::new(binder);
    }

    /// Dispatch a transport request.
    #[must_use]
    pub fn serve(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.handle(Request::from_http(request)).into_http()
    }

    /// Dispatch a request and return the encoded response.
    ///
    /// Never fails: every error becomes an HTTP status with a
    /// `{"error": message}` body in the negotiated format, or plain text when
    /// no format could be negotiated.
    #[must_use]
    pub fn handle(&self, mut request: Request) -> Response {
        let span = info_span!(
            "dispatch",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path
        );
        let _entered = span.enter();
        let start = Instant::now();

        let mut response = self.dispatch(&mut request);

        if response.get_header("x-request-id").is_none() {
            response.add_header("x-request-id", request.request_id.to_string());
        }

        info!(
            status = response.status,
            format = response.format.as_deref().unwrap_or("-"),
            body_len = response.body.len(),
            duration_us = start.elapsed().as_micros(),
            "Request dispatched"
        );
        response
    }

    fn dispatch(&self, request: &mut Request) -> Response {
        let encoding = match self.formatters.negotiate_response(request.header("accept")) {
            Ok(encoding) => encoding,
            Err(err) => {
                warn!(error = %err, "Response negotiation failed");
                let mut response = plain_text(err.status(), &err.to_string());
                if let Some(replacement) = self.filters.run_post(request, &mut response) {
                    if replacement.is_encoded() {
                        response = replacement;
                    } else {
                        debug!(status = replacement.status, "Dropping unencodable post filter replacement");
                    }
                }
                return response;
            }
        };

        if !request.body.is_empty() {
            let decoded = self
                .formatters
                .negotiate_request(request.header("content-type"))
                .and_then(|(mime, decoder)| {
                    debug!(mime = %mime, body_len = request.body.len(), "Decoding request body");
                    decoder.decode(request)
                });
            if let Err(err) = decoded {
                warn!(error = %err, "Request decoding failed");
                let response = error_response(err.status(), &err.to_string(), encoding);
                return self.finish_unrouted(request, response, encoding);
            }
        }

        let matched = match self
            .router
            .route(request.method.as_str(), &request.path, &request.headers)
        {
            Ok(matched) => matched,
            Err(err @ RouteError::NoMatchingRoute) => {
                let response = error_response(404, &err.to_string(), encoding);
                return self.finish_unrouted(request, response, encoding);
            }
            Err(err) => {
                error!(error = %err, "Routing failed");
                let response = error_response(500, &err.to_string(), encoding);
                return self.finish_unrouted(request, response, encoding);
            }
        };
        request.params = matched.params.clone();

        let chains = [&self.filters, matched.route.filters()];

        let response = match run_pre(&chains, request) {
            Some(early) => {
                debug!(status = early.status, "Pre filter answered request");
                early
            }
            None => self.invoke(request, &matched),
        };

        let mut response = encode(response, encoding);

        if let Some(replacement) = run_post(&chains, request, &mut response) {
            debug!(status = replacement.status, "Post filter replaced response");
            response = encode(replacement, encoding);
        }
        response
    }

    /// Global post phase for a response produced before a route was chosen.
    fn finish_unrouted(&self, request: &mut Request, mut response: Response, encoding: Encoding<'_>) -> Response {
        match self.filters.run_post(request, &mut response) {
            Some(replacement) => encode(replacement, encoding),
            None => response,
        }
    }

    fn invoke(&self, request: &Request, matched: &RouteMatch<'_>) -> Response {
        if let Some(requirement) = matched.route.authorization() {
            if !self.authorizer.authorize(request, requirement) {
                warn!(
                    route = %matched.route.template(),
                    requirement = %requirement,
                    "Authorization denied"
                );
                return Response::error(403, "Not authorized");
            }
        }

        match self.binder.bind(request, matched) {
            Ok(bound) => {
                for degradation in &bound.degraded {
                    warn!(
                        route = %matched.route.template(),
                        target = %degradation.target,
                        reason = %degradation.reason,
                        "Bound zero value"
                    );
                }
                bound.value
            }
            Err(err) => {
                warn!(route = %matched.route.template(), error = %err, "Bind failed");
                Response::error(err.status(), err.to_string())
            }
        }
    }
}

/// Pre phase across chains in order; the first answer wins.
fn run_pre(chains: &[&FilterChain], request: &mut Request) -> Option<Response> {
    chains.iter().find_map(|chain| chain.run_pre(request))
}

/// Post phase across chains in order; the first replacement wins.
fn run_post(chains: &[&FilterChain], request: &mut Request, response: &mut Response) -> Option<Response> {
    chains
        .iter()
        .find_map(|chain| chain.run_post(request, response))
}

/// Encode a response unless it already carries bytes. The negotiated format
/// becomes the content type unless one was already chosen.
///
/// On encode failure the response is replaced by a 500 error.
fn encode(mut response: Response, (mime, formatter): Encoding<'_>) -> Response {
    if response.data.is_empty() && response.body.is_empty() {
        if let Err(err) = NullFormatter.encode(&mut response) {
            return error_response(err.status(), &err.to_string(), (mime, formatter));
        }
    }
    if response.is_encoded() {
        if response.format.is_none() {
            response.format = Some(mime.to_string());
        }
        return response;
    }

    match formatter.encode(&mut response) {
        Ok(()) => {
            response.format = Some(mime.to_string());
            response
        }
        Err(err) => {
            error!(mime = %mime, payload = response.data.kind(), error = %err, "Response encoding failed");
            error_response(err.status(), &err.to_string(), (mime, formatter))
        }
    }
}

/// `{"error": message}` in the negotiated format, falling back to plain text.
fn error_response(status: u16, message: &str, (mime, formatter): Encoding<'_>) -> Response {
    let mut response = Response::error(status, message);
    match formatter.encode(&mut response) {
        Ok(()) => {
            response.format = Some(mime.to_string());
            response
        }
        Err(_) => plain_text(status, message),
    }
}

fn plain_text(status: u16, message: &str) -> Response {
    let mut response = Response::new(status);
    response.body = message.as_bytes().to_vec();
    response.format = Some(TEXT.to_string());
    response
}
