//! # Router Module
//!
//! Path-template routing with linear first-match resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling `{name}` path templates into anchored regex matchers
//! - Holding each route's method and header requirements, target and filters
//! - Selecting the first registered route that qualifies for a request
//! - Extracting named path parameters into a request-scoped [`RouteMatch`]
//!
//! ## Matching rules
//!
//! A route qualifies when its path regex matches the request path, its method
//! (if any) equals the request method ignoring case, and every header matcher
//! finds its header present with a matching value. Placeholders capture any run
//! of non-`/` characters; empty captures are left out of the parameters.
//!
//! Lookup is O(n) in the number of routes and registration order is the only
//! tie-break.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use webdispatch::{Request, Response, Router};
//!
//! let mut router = Router::new();
//! router
//!     .add_route("/pets/{id}")
//!     .unwrap()
//!     .for_method("get")
//!     .to_request_fn(|req: &Request| Response::text(200, req.param("id").unwrap_or("")));
//!
//! let headers: Vec<(Arc<str>, String)> = Vec::new();
//! let matched = router.route("GET", "/pets/42", &headers).unwrap();
//! assert_eq!(matched.param("id"), Some("42"));
//! ```

mod core;
mod route;

pub use core::{compile_template, RouteError, RouteMatch, Router};
pub use route::Route;
