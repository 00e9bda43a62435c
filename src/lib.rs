//! # Bildwald Backend Library
//!
//! Bildwald serves image galleries over a REST API. Its main feature is the
//! streaming gallery export: every image of a gallery is packed into a
//! `tar.gz` archive that is produced and sent to the client at the same
//! time, with memory bounded by a small pipe instead of the gallery size.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server and routing
//! - **SQLx**: Asynchronous database operations with SQLite
//! - **Tokio**: Async runtime; archive production runs on blocking threads
//! - **flate2**: gzip compression of the archive stream
//!
//! ## Core Components
//!
//! - [`access`]: Request principal and the export permission check
//! - [`archive`]: tar container encoding and decoding
//! - [`config`]: Application configuration management
//! - [`db`]: Database schema initialization
//! - [`error`]: Centralized error handling and HTTP error responses
//! - [`export`]: Export jobs, the producer/consumer pipe and admission control
//! - [`metrics`]: Export counters
//! - [`middleware`]: Bearer token authentication
//! - [`routes`]: HTTP API endpoint handlers
//! - [`state`]: Shared application state
//! - [`store`]: Gallery and image lookups
//! - [`types`]: Data transfer objects

pub mod access;
pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
