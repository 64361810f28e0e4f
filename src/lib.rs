//! # webdispatch
//!
//! **webdispatch** is the request-dispatch core for small HTTP APIs: it turns an
//! `http::Request` into a call of an ordinary Rust function or controller
//! method and the function's result back into an encoded `http::Response`.
//!
//! ## Overview
//!
//! - **[`router`]** - ordered route table with `{name}` path templates, method
//!   and header constraints, first match wins
//! - **[`binder`]** - builds handler arguments by position from path
//!   parameters, the request itself and the decoded body, with lenient
//!   zero-value fallback
//! - **[`formatter`]** - JSON and plain-text codecs and `Accept`/`Content-Type`
//!   negotiation
//! - **[`filter`]** - pre/post interceptors (CORS, access log, auth)
//! - **[`auth`]** - encrypted self-expiring session tickets, bcrypt passwords
//!   and route authorization
//! - **[`dispatcher`]** - the pipeline tying the above together
//! - **[`config`]** / **[`logging`]** - YAML + environment configuration and
//!   `tracing` subscriber setup
//!
//! The crate has no transport of its own. Any server that can produce an
//! `http::Request<Vec<u8>>` can call [`Dispatcher::serve`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use serde_json::json;
//! use webdispatch::{controller, Body, Dispatcher, Response};
//!
//! #[derive(Deserialize)]
//! struct Note {
//!     text: String,
//! }
//!
//! struct Notes;
//!
//! #[controller]
//! impl Notes {
//!     pub fn get(&self, id: i64) -> Response {
//!         Response::json(200, json!({ "id": id }))
//!     }
//!     pub fn post(&self, id: i64, note: Body<Note>) -> Response {
//!         Response::json(201, json!({ "id": id, "text": note.text }))
//!     }
//!     pub fn put(&self, _id: i64) -> Response {
//!         Response::new(202)
//!     }
//!     pub fn delete(&self, _id: i64) -> Response {
//!         Response::new(204)
//!     }
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .router_mut()
//!     .add_rest_routes("/notes/{id}", &Arc::new(Notes))
//!     .unwrap();
//!
//! let req = http::Request::post("/notes/7")
//!     .header("content-type", "application/json")
//!     .body(br#"{"text":"hi"}"#.to_vec())
//!     .unwrap();
//! let res = dispatcher.serve(req);
//! assert_eq!(res.status(), 201);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

extern crate self as webdispatch;

pub mod auth;
pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod filter;
pub mod formatter;
pub mod ids;
pub mod logging;
pub mod request;
pub mod response;
pub mod router;

pub use auth::{TicketCodec, TicketConfig, TicketMode};
pub use binder::{Body, Controller, Endpoint};
pub use dispatcher::Dispatcher;
pub use filter::{CorsFilter, Filter, LogFilter};
pub use ids::RequestId;
pub use request::{RemoteAddr, Request};
pub use response::{Payload, Response};
pub use router::{Route, RouteError, Router};
pub use webdispatch_macros::controller;
