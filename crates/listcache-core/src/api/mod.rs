//! REST API access for the shopping-list backend.
//!
//! This module provides the `Transport` seam the offline layer depends on,
//! the `ApiClient` implementing it over HTTP, and the route builders for the
//! backend's endpoints.

pub mod client;
pub mod error;
pub mod routes;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::Transport;
