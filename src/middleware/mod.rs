//! Middleware components for HTTP request processing.
//!
//! - `auth`: resolves the request's [`crate::access::Principal`] from a bearer token

pub mod auth;
