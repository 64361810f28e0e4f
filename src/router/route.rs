use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::core::RouteError;
use crate::binder::{Controller, Endpoint, IntoEndpoint, RequestFn, Target};
use crate::filter::{Filter, FilterChain};
use crate::request::{ParamVec, Request};
use crate::response::Response;

/// A registered path/method/header matcher bound to a target.
///
/// Routes are configured through the builder methods right after
/// [`Router::add_route`](super::Router::add_route) and are read-only once
/// dispatch starts.
pub struct Route {
    template: String,
    pattern: Regex,
    param_names: Vec<Arc<str>>,
    method: Option<String>,
    headers: Vec<(String, Regex)>,
    target: Option<Target>,
    authorization: Option<String>,
    filters: FilterChain,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.template)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("target", &self.target)
            .field("authorization", &self.authorization)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Route {
    pub(crate) fn new(template: &str, pattern: Regex, param_names: Vec<Arc<str>>) -> Self {
        Self {
            template: template.to_string(),
            pattern,
            param_names,
            method: None,
            headers: Vec::new(),
            target: None,
            authorization: None,
            filters: FilterChain::new(),
        }
    }

    /// Restrict the route to one HTTP verb, compared case-insensitively.
    pub fn for_method(&mut self, verb: impl AsRef<str>) -> &mut Self {
        self.method = Some(verb.as_ref().to_ascii_uppercase());
        self
    }

    /// Require header `name` to be present with a value matching `pattern`.
    ///
    /// The pattern is unanchored: it only has to match somewhere in the value.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidHeaderPattern`] when `pattern` is not a valid regex.
    pub fn for_header(&mut self, name: &str, pattern: &str) -> Result<&mut Self, RouteError> {
        let regex = Regex::new(pattern).map_err(|e| RouteError::InvalidHeaderPattern {
            header: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.push((name.to_ascii_lowercase(), regex));
        Ok(self)
    }

    /// Bind a plain callable that receives only the request.
    pub fn to_request_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let f: RequestFn = Arc::new(f);
        self.target = Some(Target::Request(f));
        self
    }

    /// Bind a free function whose parameters are filled by the binder.
    ///
    /// ```rust
    /// use webdispatch::{Body, Response, Router};
    ///
    /// #[derive(serde::Deserialize)]
    /// struct Item {
    ///     name: String,
    /// }
    ///
    /// fn update(id: i64, item: Body<Item>) -> Response {
    ///     Response::json(200, serde_json::json!({"id": id, "name": item.name}))
    /// }
    ///
    /// let mut router = Router::new();
    /// router.add_route("/items/{id}").unwrap().for_method("PUT").to_fn(update);
    /// ```
    pub fn to_fn<H, Args>(&mut self, handler: H) -> &mut Self
    where
        H: IntoEndpoint<Args>,
    {
        self.target = Some(Target::Function(handler.into_endpoint()));
        self
    }

    /// Bind a pre-built endpoint as a free-function target.
    pub fn to_endpoint(&mut self, endpoint: Endpoint) -> &mut Self {
        self.target = Some(Target::Function(endpoint));
        self
    }

    /// Bind the controller action named `action`.
    ///
    /// The name is resolved here, once; requests never look it up again.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownAction`] when the controller exports no such action.
    pub fn to_method<C>(&mut self, controller: &Arc<C>, action: &str) -> Result<&mut Self, RouteError>
    where
        C: Controller + ?Sized,
    {
        let name = controller.name();
        let endpoint = Arc::clone(controller)
            .action(action)
            .ok_or_else(|| RouteError::UnknownAction {
                controller: name.to_string(),
                action: action.to_string(),
            })?;
        self.target = Some(Target::Method {
            controller: name,
            action: action.to_string(),
            endpoint,
        });
        Ok(self)
    }

    /// Attach a filter that runs only for this route, after the global chain.
    pub fn with_filter(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.add(filter);
        self
    }

    /// Require the authenticated user to satisfy `requirement`.
    pub fn with_authorization(&mut self, requirement: impl Into<String>) -> &mut Self {
        self.authorization = Some(requirement.into());
        self
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in template order.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    #[must_use]
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub(crate) fn describe(&self) -> String {
        format!("{} {}", self.method.as_deref().unwrap_or("*"), self.template)
    }

    /// Match one request; `Some` carries the non-empty captures.
    pub(crate) fn matches(
        &self,
        method: &str,
        path: &str,
        headers: &[(Arc<str>, String)],
    ) -> Option<ParamVec> {
        let captures = self.pattern.captures(path)?;

        if let Some(verb) = &self.method {
            if !verb.eq_ignore_ascii_case(method) {
                return None;
            }
        }

        for (name, regex) in &self.headers {
            let value = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())?;
            if !regex.is_match(value) {
                return None;
            }
        }

        let params = self
            .param_names
            .iter()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| m.as_str())
                    .filter(|v| !v.is_empty())
                    .map(|v| (Arc::clone(name), v.to_string()))
            })
            .collect();
        Some(params)
    }
}
