//! # Auth Module
//!
//! Stateless session tickets, password hashing and route authorization.
//!
//! ## Overview
//!
//! - [`TicketCodec`] issues encrypted tickets binding opaque user data to an
//!   expiry, and verifies them without server-side state. It doubles as a
//!   pre-phase [`Filter`](crate::filter::Filter) that populates
//!   [`Request::user_data`](crate::Request) or answers 401.
//! - [`password`] wraps bcrypt with explicit, caller-stored salts.
//! - [`Authorizer`] checks a route's authorization requirement against the
//!   authenticated request.
//!
//! ## Example
//!
//! ```
//! use webdispatch::auth::{TicketCodec, TicketConfig};
//!
//! let codec = TicketCodec::new(TicketConfig::new(*b"0123456789abcdef")).unwrap();
//! let ticket = codec.signin("user-42").unwrap();
//! assert_eq!(codec.authenticate_token(&ticket).as_deref(), Some("user-42"));
//! ```

mod authorizer;
pub mod password;
mod ticket;

pub use authorizer::{Authorizer, UserDataAuthorizer};
pub use password::PasswordError;
pub use ticket::{
    TicketCodec, TicketConfig, TicketError, TicketMode, DEFAULT_BCRYPT_COST, DEFAULT_EXPIRY_MINUTES,
};
