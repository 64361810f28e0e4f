//! Compile-time adapters from typed handler signatures to [`Endpoint`]s.
//!
//! Each argument is built in declaration order through [`Bindable`], so a
//! handler's signature alone decides what it receives:
//!
//! ```rust
//! use webdispatch::{Body, Request, Response};
//! use webdispatch::binder::IntoEndpoint;
//!
//! #[derive(serde::Deserialize)]
//! struct Model {
//!     #[serde(rename = "Id")]
//!     id: i64,
//! }
//!
//! // `id` is placeholder 0, `model` comes from the body, `req` is the request.
//! fn handler(id: i64, model: Body<Model>, req: Request) -> Response {
//!     Response::json(200, serde_json::json!({"id": id, "Id": model.id, "path": req.path}))
//! }
//!
//! let _endpoint = handler.into_endpoint();
//! ```

use std::sync::Arc;

use super::core::{BindContext, Bindable, Bound, Endpoint, HandlerOutput};

/// Free functions and closures usable as route targets.
///
/// Implemented for `Fn(A1, .., An) -> R` with up to eight [`Bindable`]
/// parameters and a [`HandlerOutput`] return type.
pub trait IntoEndpoint<Args>: Send + Sync + Sized + 'static {
    fn into_endpoint(self) -> Endpoint;
}

/// Methods of a controller `C` usable as route targets.
///
/// Implemented for `Fn(&C, A1, .., An) -> R`, so `C::method` paths work
/// directly.
pub trait MethodHandler<C, Args>: Send + Sync + Sized + 'static {
    fn into_method_endpoint(self, instance: Arc<C>) -> Endpoint;
}

macro_rules! impl_handlers {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, R, $($ty,)*> IntoEndpoint<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: HandlerOutput,
            $($ty: Bindable,)*
        {
            fn into_endpoint(self) -> Endpoint {
                Endpoint::new(move |ctx: &BindContext<'_>| {
                    let mut degraded = Vec::new();
                    let mut position = 0usize;
                    $(
                        let $ty = <$ty as Bindable>::bind(ctx, position)?.absorb(&mut degraded);
                        position += 1;
                    )*
                    let response = (self)($($ty),*).into_response()?;
                    Ok(Bound { value: response, degraded })
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, C, R, $($ty,)*> MethodHandler<C, ($($ty,)*)> for F
        where
            F: Fn(&C, $($ty),*) -> R + Send + Sync + 'static,
            C: Send + Sync + 'static,
            R: HandlerOutput,
            $($ty: Bindable,)*
        {
            fn into_method_endpoint(self, instance: Arc<C>) -> Endpoint {
                Endpoint::new(move |ctx: &BindContext<'_>| {
                    let mut degraded = Vec::new();
                    let mut position = 0usize;
                    $(
                        let $ty = <$ty as Bindable>::bind(ctx, position)?.absorb(&mut degraded);
                        position += 1;
                    )*
                    let response = (self)(&*instance, $($ty),*).into_response()?;
                    Ok(Bound { value: response, degraded })
                })
            }
        }
    };
}

impl_handlers!();
impl_handlers!(A1);
impl_handlers!(A1, A2);
impl_handlers!(A1, A2, A3);
impl_handlers!(A1, A2, A3, A4);
impl_handlers!(A1, A2, A3, A4, A5);
impl_handlers!(A1, A2, A3, A4, A5, A6);
impl_handlers!(A1, A2, A3, A4, A5, A6, A7);
impl_handlers!(A1, A2, A3, A4, A5, A6, A7, A8);
