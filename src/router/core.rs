//! Router core: template compilation and first-match resolution.

use std::sync::Arc;
use std::time::Instant;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::route::Route;
use crate::binder::Controller;
use crate::request::ParamVec;

/// Errors raised while building or querying the route table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid route template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid pattern for header {header:?}: {reason}")]
    InvalidHeaderPattern { header: String, reason: String },

    #[error("controller {controller} has no action {action:?}")]
    UnknownAction { controller: String, action: String },

    #[error("no matching route")]
    NoMatchingRoute,
}

/// Result of matching a request against the route table.
///
/// Parameters are request-scoped; the route itself is never mutated.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Non-empty captures in template order
    pub params: ParamVec,
}

impl RouteMatch<'_> {
    /// Get a captured parameter by name, last occurrence wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered route table with linear first-match lookup.
///
/// Routes are tried in registration order and the first qualifying route wins;
/// there is no specificity ranking. Callers that register overlapping
/// templates rely on that order.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `template` and append a new route for further configuration.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidTemplate`] for malformed or duplicate placeholders.
    ///
    /// # Example
    ///
    /// ```rust
    /// use webdispatch::{Request, Response, Router};
    ///
    /// let mut router = Router::new();
    /// router
    ///     .add_route("/items/{id}")
    ///     .unwrap()
    ///     .for_method("GET")
    ///     .to_request_fn(|_req: &Request| Response::new(200));
    /// ```
    pub fn add_route(&mut self, template: &str) -> Result<&mut Route, RouteError> {
        let (pattern, param_names) = compile_template(template)?;
        debug!(template = %template, pattern = %pattern, "Route compiled");
        self.routes.push(Route::new(template, pattern, param_names));
        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index])
    }

    /// Register `GET`, `POST`, `PUT` and `DELETE` routes for one template,
    /// bound to the controller's `Get`, `Post`, `Put` and `Delete` actions.
    ///
    /// # Errors
    ///
    /// Fails if the template is invalid or the controller lacks one of the four
    /// actions. Routes registered before the failure stay in the table.
    pub fn add_rest_routes<C>(&mut self, template: &str, controller: &Arc<C>) -> Result<(), RouteError>
    where
        C: Controller + ?Sized,
    {
        for (verb, action) in [("GET", "Get"), ("POST", "Post"), ("PUT", "Put"), ("DELETE", "Delete")] {
            self.add_route(template)?
                .for_method(verb)
                .to_method(controller, action)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Log the routing table summary.
    pub fn log_routes(&self) {
        let summary: Vec<String> = self.routes.iter().take(10).map(Route::describe).collect();
        info!(
            routes_count = self.routes.len(),
            routes_summary = ?summary,
            "Routing table loaded"
        );
    }

    /// Find the first route qualifying for `method`, `path` and `headers`.
    ///
    /// # Errors
    ///
    /// [`RouteError::NoMatchingRoute`] when nothing qualifies.
    pub fn route(
        &self,
        method: &str,
        path: &str,
        headers: &[(Arc<str>, String)],
    ) -> Result<RouteMatch<'_>, RouteError> {
        let match_start = Instant::now();

        for route in &self.routes {
            if let Some(params) = route.matches(method, path, headers) {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.template(),
                    path_params = ?params,
                    duration_us = match_start.elapsed().as_micros(),
                    "Route matched"
                );
                return Ok(RouteMatch { route, params });
            }
        }

        warn!(
            method = %method,
            path = %path,
            routes_count = self.routes.len(),
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        Err(RouteError::NoMatchingRoute)
    }
}

/// Compile a path template into an anchored regex and its placeholder names.
///
/// `/users/{id}/posts/{post_id}` becomes
/// `^/users/(?P<id>[^/]*)/posts/(?P<post_id>[^/]*)$` with names
/// `["id", "post_id"]`. Literal text is escaped.
///
/// # Errors
///
/// [`RouteError::InvalidTemplate`] for unbalanced braces, names that are not
/// identifiers, and repeated names.
pub fn compile_template(template: &str) -> Result<(Regex, Vec<Arc<str>>), RouteError> {
    let invalid = |reason: String| RouteError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut pattern = String::with_capacity(template.len() + 16);
    pattern.push('^');
    let mut names: Vec<Arc<str>> = Vec::with_capacity(template.matches('{').count());

    let mut rest = template;
    while let Some(brace) = rest.find(['{', '}']) {
        let (literal, tail) = rest.split_at(brace);
        pattern.push_str(&regex::escape(literal));

        if tail.starts_with('}') {
            return Err(invalid("unmatched '}'".to_string()));
        }
        let close = tail
            .find('}')
            .ok_or_else(|| invalid("unclosed placeholder".to_string()))?;
        let name = &tail[1..close];

        if !is_identifier(name) {
            return Err(invalid(format!("invalid placeholder name {name:?}")));
        }
        if names.iter().any(|n| n.as_ref() == name) {
            return Err(invalid(format!("duplicate placeholder {name:?}")));
        }

        pattern.push_str("(?P<");
        pattern.push_str(name);
        pattern.push_str(">[^/]*)");
        names.push(Arc::from(name));

        rest = &tail[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
    Ok((regex, names))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
