//! relay-api: HTTP surface for wa-relay
//!
//! Lifecycle event intake, provider webhooks, and read-only lead and
//! catalog queries. Built with axum.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, app, start_server};
