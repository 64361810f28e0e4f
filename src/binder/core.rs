//! Binder core: targets, endpoints, argument binding and the two-tier error policy.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use super::lenient::bind_lenient;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, RouteMatch};

/// Structural binding failures. These abort the bind.
///
/// Per-argument parse failures are not errors; they come back as
/// [`Degradation`]s on a successful [`Bound`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("route has no target")]
    NoTarget,

    /// Handler returned `None`
    #[error("nil response")]
    EmptyResponse,

    /// Not even the zero value of the argument type could be built
    #[error("cannot bind {parameter} as {type_name}: {reason}")]
    Unbindable {
        parameter: String,
        type_name: &'static str,
        reason: String,
    },

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl BindError {
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            BindError::Unbindable { .. } => 400,
            _ => 500,
        }
    }
}

/// One absorbed binding failure: what was being bound and why it fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    /// Parameter or field path, e.g. `param id` or `body.Tester.count`
    pub target: String,
    pub reason: String,
}

impl Degradation {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

/// A successfully bound value plus any failures absorbed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<T> {
    pub value: T,
    pub degraded: Vec<Degradation>,
}

impl<T> Bound<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            degraded: Vec::new(),
        }
    }

    pub fn degraded(value: T, degradation: Degradation) -> Self {
        Self {
            value,
            degraded: vec![degradation],
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Bound<U> {
        Bound {
            value: f(self.value),
            degraded: self.degraded,
        }
    }

    /// Move the degradations into `sink` and return the value.
    pub fn absorb(self, sink: &mut Vec<Degradation>) -> T {
        sink.extend(self.degraded);
        self.value
    }
}

/// What a handler invocation sees: the request and the route match.
#[derive(Debug, Clone, Copy)]
pub struct BindContext<'a> {
    pub request: &'a Request,
    pub route: &'a Route,
    pub params: &'a [(Arc<str>, String)],
}

impl<'a> BindContext<'a> {
    #[must_use]
    pub fn new(request: &'a Request, matched: &'a RouteMatch<'a>) -> Self {
        Self {
            request,
            route: matched.route,
            params: &matched.params,
        }
    }

    /// Placeholder name and captured value at a declaration position.
    ///
    /// The i-th declared handler parameter maps to the i-th template
    /// placeholder. The value is `None` when the placeholder does not exist or
    /// its capture was empty.
    #[must_use]
    pub fn param_at(&self, position: usize) -> (Option<&'a str>, Option<&'a str>) {
        let Some(name) = self.route.param_names().get(position) else {
            return (None, None);
        };
        let value = self
            .params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str());
        (Some(name.as_ref()), value)
    }
}

type EndpointFn = dyn Fn(&BindContext<'_>) -> Result<Bound<Response>, BindError> + Send + Sync;

/// Type-erased handler adapter of fixed shape.
///
/// Built at registration by [`IntoEndpoint`](super::IntoEndpoint) or
/// [`MethodHandler`](super::MethodHandler); invoked once per request.
#[derive(Clone)]
pub struct Endpoint(Arc<EndpointFn>);

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Endpoint(..)")
    }
}

impl Endpoint {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&BindContext<'_>) -> Result<Bound<Response>, BindError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a free function with bindable parameters.
    pub fn function<H, Args>(handler: H) -> Self
    where
        H: super::IntoEndpoint<Args>,
    {
        handler.into_endpoint()
    }

    /// Bind a method to a shared controller instance.
    pub fn method<C, H, Args>(instance: Arc<C>, handler: H) -> Self
    where
        H: super::MethodHandler<C, Args>,
    {
        handler.into_method_endpoint(instance)
    }

    /// Build the arguments and call the handler.
    ///
    /// # Errors
    ///
    /// Returns the first structural [`BindError`].
    pub fn invoke(&self, ctx: &BindContext<'_>) -> Result<Bound<Response>, BindError> {
        (self.0)(ctx)
    }
}

pub type RequestFn = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Route target, resolved once at registration.
#[derive(Clone)]
pub enum Target {
    /// Plain callable receiving only the request; no argument binding
    Request(RequestFn),
    /// Free function with bindable parameters
    Function(Endpoint),
    /// Action on a shared controller instance, selected by name
    Method {
        controller: &'static str,
        action: String,
        endpoint: Endpoint,
    },
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Request(_) => f.write_str("Request(..)"),
            Target::Function(_) => f.write_str("Function(..)"),
            Target::Method {
                controller, action, ..
            } => f
                .debug_struct("Method")
                .field("controller", controller)
                .field("action", action)
                .finish(),
        }
    }
}

impl Target {
    /// # Errors
    ///
    /// Propagates the endpoint's structural bind errors.
    pub fn invoke(&self, ctx: &BindContext<'_>) -> Result<Bound<Response>, BindError> {
        match self {
            Target::Request(f) => Ok(Bound::clean(f(ctx.request))),
            Target::Function(endpoint) | Target::Method { endpoint, .. } => endpoint.invoke(ctx),
        }
    }
}

/// A handler parameter type the binder knows how to build.
pub trait Bindable: Sized {
    /// Build the argument declared at `position`.
    ///
    /// # Errors
    ///
    /// Only structural failures; anything recoverable becomes a degradation.
    fn bind(ctx: &BindContext<'_>, position: usize) -> Result<Bound<Self>, BindError>;
}

impl Bindable for Request {
    fn bind(ctx: &BindContext<'_>, _position: usize) -> Result<Bound<Self>, BindError> {
        Ok(Bound::clean(ctx.request.clone()))
    }
}

/// Aggregate parameter bound from the decoded body mapping.
///
/// Fields are looked up by their serialized name (`#[serde(rename)]` applies).
/// Absent fields take their zero value and unconvertible values fall back to
/// zero with a degradation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body<T>(pub T);

impl<T> Body<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Body<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Body<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> Bindable for Body<T> {
    fn bind(ctx: &BindContext<'_>, _position: usize) -> Result<Bound<Self>, BindError> {
        let data = Value::Object(ctx.request.data.clone());
        Ok(bind_lenient::<T>(&data, "body")?.map(Body))
    }
}

/// Scalar parsed from the path parameter at the parameter's position.
pub trait ParamValue: Sized {
    const TYPE_NAME: &'static str;

    /// `None` when `raw` does not parse.
    fn parse_param(raw: &str) -> Option<Self>;

    fn zero() -> Self;
}

impl<T: ParamValue> Bindable for T {
    fn bind(ctx: &BindContext<'_>, position: usize) -> Result<Bound<Self>, BindError> {
        match ctx.param_at(position) {
            (Some(name), Some(raw)) => match T::parse_param(raw) {
                Some(value) => Ok(Bound::clean(value)),
                None => Ok(Bound::degraded(
                    T::zero(),
                    Degradation::new(
                        format!("param {name}"),
                        format!("cannot parse {raw:?} as {}", T::TYPE_NAME),
                    ),
                )),
            },
            _ => Ok(Bound::clean(T::zero())),
        }
    }
}

/// Boolean literals accepted for parameters and coerced strings.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl ParamValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn parse_param(raw: &str) -> Option<Self> {
        parse_bool(raw)
    }

    fn zero() -> Self {
        false
    }
}

impl ParamValue for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_param(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn zero() -> Self {
        String::new()
    }
}

macro_rules! numeric_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn parse_param(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }

                fn zero() -> Self {
                    <$ty>::default()
                }
            }
        )*
    };
}

numeric_param!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<S: ParamValue> ParamValue for Option<S> {
    const TYPE_NAME: &'static str = S::TYPE_NAME;

    fn parse_param(raw: &str) -> Option<Self> {
        S::parse_param(raw).map(Some)
    }

    fn zero() -> Self {
        None
    }
}

/// Return types a handler may declare.
pub trait HandlerOutput {
    /// # Errors
    ///
    /// [`BindError::EmptyResponse`] when there is no response.
    fn into_response(self) -> Result<Response, BindError>;
}

impl HandlerOutput for Response {
    fn into_response(self) -> Result<Response, BindError> {
        Ok(self)
    }
}

impl HandlerOutput for Option<Response> {
    fn into_response(self) -> Result<Response, BindError> {
        self.ok_or(BindError::EmptyResponse)
    }
}

/// Entry point the dispatcher calls for a routed request.
pub trait Binder: Send + Sync {
    /// # Errors
    ///
    /// Structural failures only; see [`BindError`].
    fn bind(&self, request: &Request, matched: &RouteMatch<'_>) -> Result<Bound<Response>, BindError>;
}

/// Invokes the route target with panic recovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBinder;

impl Binder for DefaultBinder {
    fn bind(&self, request: &Request, matched: &RouteMatch<'_>) -> Result<Bound<Response>, BindError> {
        let target = matched.route.target().ok_or(BindError::NoTarget)?;
        let ctx = BindContext::new(request, matched);

        match panic::catch_unwind(AssertUnwindSafe(|| target.invoke(&ctx))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %request.request_id,
                    route = %matched.route.template(),
                    target = ?target,
                    panic = %message,
                    "Handler panicked"
                );
                Err(BindError::Panicked(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A shared object exporting named actions.
///
/// Usually generated by `#[controller]` on an inherent impl block, which maps
/// each `pub fn name(&self, ..)` to the PascalCase action `Name`.
pub trait Controller: Send + Sync + 'static {
    /// Endpoint for `name`, bound to this instance.
    fn action(self: Arc<Self>, name: &str) -> Option<Endpoint>;

    /// Names of every exported action.
    fn actions(&self) -> &'static [&'static str];

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
