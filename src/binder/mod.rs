//! # Binder Module
//!
//! Builds a handler's argument list from the routed request and invokes it.
//!
//! ## Overview
//!
//! Every route target is resolved at registration into a closed [`Target`]:
//! a plain request callable, a free function, or an action on a shared
//! [`Controller`]. Functions and methods are wrapped in an [`Endpoint`] by the
//! generic adapters [`IntoEndpoint`] and [`MethodHandler`], which bind each
//! parameter in declaration order through [`Bindable`]:
//!
//! - [`Request`](crate::Request) receives a copy of the current request
//! - [`Body<T>`] is bound from the decoded body mapping by a lenient `serde`
//!   deserializer
//! - scalars ([`ParamValue`]: `bool`, integers, floats, `String`, `Option` of
//!   those) parse the path parameter at the same position
//!
//! ## Error policy
//!
//! Recoverable failures (an unparseable parameter, a body field of the wrong
//! shape) become the type's zero value and are reported as [`Degradation`]s
//! on the returned [`Bound`]. Structural failures abort with a [`BindError`].

mod core;
mod handler;
mod lenient;
mod zero;

pub use core::{
    BindContext, BindError, Bindable, Binder, Body, Bound, Controller, DefaultBinder, Degradation,
    Endpoint, HandlerOutput, ParamValue, RequestFn, Target,
};
pub use handler::{IntoEndpoint, MethodHandler};
