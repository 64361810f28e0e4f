//! # Formatter Module
//!
//! Per-media-type codecs and content negotiation.
//!
//! A request formatter decodes the raw body into the request's data mapping;
//! a response formatter encodes the response payload into bytes. Both are
//! registered under a media type in a [`FormatterRegistry`], which also picks
//! the formatter for an exchange from the `Content-Type` and `Accept` headers.
//!
//! ## Built-in formatters
//!
//! - [`JsonFormatter`] (`application/json`): arbitrary nested data both ways
//! - [`TextFormatter`] (`text/plain`): strings and bytes only
//! - [`NullFormatter`]: no-op, used for responses without a payload
//!
//! ## Negotiation
//!
//! Media types compare case-insensitively with parameters dropped. Without a
//! header, or on a `*/*` entry, the first registered formatter is chosen. A
//! `type/*` range selects the first registered formatter of that type.
//!
//! ```rust
//! use webdispatch::formatter::FormatterRegistry;
//!
//! let registry = FormatterRegistry::default();
//! let (mime, _) = registry
//!     .negotiate_response(Some("text/html, text/plain;q=0.9"))
//!     .unwrap();
//! assert_eq!(mime, "text/plain");
//! ```

mod core;
mod json;
mod null;
mod registry;
mod text;

pub use core::{media_type, FormatError, RequestFormatter, ResponseFormatter};
pub use json::{JsonFormatter, JSON};
pub use null::NullFormatter;
pub use registry::FormatterRegistry;
pub use text::{TextFormatter, TEXT};
