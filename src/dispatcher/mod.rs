//! # Dispatcher Module
//!
//! Orchestrates one request from transport input to encoded response.
//!
//! ## Request Flow
//!
//! 1. Negotiate the response format from `Accept` (406 on failure)
//! 2. Decode a non-empty body with the `Content-Type` formatter (415/500)
//! 3. Route by method, path and headers (404)
//! 4. Pre filters, global then route; the first answer skips the handler
//! 5. Check the route's authorization requirement (403)
//! 6. Bind and invoke the target (400/500 on structural bind failures)
//! 7. Encode the response payload (500 on failure)
//! 8. Post filters, global then route; a replacement is encoded and wins
//!
//! ## Error Handling
//!
//! Every failure maps to a status with a `{"error": message}` body encoded in
//! the negotiated format. When no format was negotiated, or the format cannot
//! carry the error object, the message is sent as `text/plain`.
//!
//! ## Concurrency
//!
//! The route table, formatters and filters are only mutable through
//! `&mut Dispatcher`. Dispatch itself takes `&self`, so a configured
//! dispatcher is shared read-only across connections.

mod core;

pub use core::Dispatcher;
