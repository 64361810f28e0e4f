//! # Filter Module
//!
//! Interceptors that run around handler dispatch.
//!
//! ## Overview
//!
//! A [`Filter`] sees every request twice: before binding (it may answer the
//! request itself) and after encoding (it may edit or replace the response).
//! Filters are kept in a [`FilterChain`], one global chain on the dispatcher
//! and one per route; global filters run first in both phases.
//!
//! Bundled filters:
//!
//! - [`CorsFilter`] - preflight handling and `Access-Control-Allow-*` headers
//! - [`LogFilter`] - structured access log
//! - [`TicketCodec`](crate::auth::TicketCodec) - ticket authentication

mod core;
mod cors;
mod log;

pub use core::{Filter, FilterChain};
pub use cors::{CorsFilter, DEFAULT_ALLOW_HEADERS, DEFAULT_ALLOW_METHODS, DEFAULT_ALLOW_ORIGIN};
pub use log::LogFilter;
