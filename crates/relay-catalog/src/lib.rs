//! relay-catalog: tenant product catalogs
//!
//! Fetches products from a tenant's website API (none, bearer, basic or
//! API-key auth) and falls back to the tenant's static catalog whenever the
//! API is disabled or failing.

mod cache;
mod client;
pub mod error;
mod resolver;

pub use cache::{CatalogCache, CatalogRefresher, RefresherHandle};
pub use client::CatalogClient;
pub use error::{CatalogError, Result};
pub use resolver::{CatalogProvider, CatalogResolver};
