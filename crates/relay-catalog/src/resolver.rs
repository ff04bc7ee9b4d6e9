//! Catalog resolution with static fallback

use async_trait::async_trait;
use relay_core::{Product, TenantConfig};
use tracing::{debug, warn};

use crate::client::CatalogClient;

/// Source of a tenant's current catalog
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Current products for a tenant. Never fails.
    async fn resolve(&self, tenant: &TenantConfig) -> Vec<Product>;
}

/// Fetches from the tenant's product API, falling back to the static catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    client: CatalogClient,
}

impl CatalogResolver {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogProvider for CatalogResolver {
    async fn resolve(&self, tenant: &TenantConfig) -> Vec<Product> {
        let Some(api) = tenant.product_api.as_ref().filter(|api| api.is_active()) else {
            debug!(tenant = %tenant.id, count = tenant.products.len(), "Using static catalog");
            return tenant.products.clone();
        };

        match self.client.fetch(api).await {
            Ok(products) => products,
            Err(e) => {
                warn!(
                    tenant = %tenant.id,
                    "Product API failed, falling back to static catalog: {}",
                    e
                );
                tenant.products.clone()
            }
        }
    }
}
