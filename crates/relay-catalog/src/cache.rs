//! Per-tenant catalog cache and periodic refresher

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{Product, TenantConfig, TenantDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::resolver::{CatalogProvider, CatalogResolver};

#[derive(Debug, Clone)]
struct CacheEntry {
    products: Vec<Product>,
    fetched_at: Instant,
}

/// Keeps the last resolved catalog per tenant.
///
/// Tenants with an active product API are served from the cache until their
/// refresh interval elapses. Static catalogs are read straight from the
/// tenant record.
pub struct CatalogCache {
    resolver: CatalogResolver,
    entries: DashMap<String, CacheEntry>,
}

impl CatalogCache {
    pub fn new(resolver: CatalogResolver) -> Self {
        Self {
            resolver,
            entries: DashMap::new(),
        }
    }

    /// Last cached catalog for a tenant, regardless of age
    pub fn get(&self, tenant_id: &str) -> Option<Vec<Product>> {
        self.entries.get(tenant_id).map(|e| e.products.clone())
    }

    pub fn is_stale(&self, tenant: &TenantConfig) -> bool {
        let Some(api) = tenant.product_api.as_ref().filter(|a| a.is_active()) else {
            return false;
        };

        match self.entries.get(&tenant.id) {
            Some(entry) => entry.fetched_at.elapsed() >= api.refresh_period(),
            None => true,
        }
    }

    /// Re-resolve and store a tenant's catalog
    pub async fn refresh(&self, tenant: &TenantConfig) -> Vec<Product> {
        let products = self.resolver.resolve(tenant).await;
        self.entries.insert(
            tenant.id.clone(),
            CacheEntry {
                products: products.clone(),
                fetched_at: Instant::now(),
            },
        );
        products
    }

    pub fn invalidate(&self, tenant_id: &str) {
        self.entries.remove(tenant_id);
    }
}

#[async_trait]
impl CatalogProvider for CatalogCache {
    async fn resolve(&self, tenant: &TenantConfig) -> Vec<Product> {
        let api_active = tenant
            .product_api
            .as_ref()
            .is_some_and(|a| a.is_active());
        if !api_active {
            return tenant.products.clone();
        }

        if !self.is_stale(tenant) {
            if let Some(products) = self.get(&tenant.id) {
                return products;
            }
        }

        self.refresh(tenant).await
    }
}

/// Handle for a running refresher
pub struct RefresherHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefresherHandle {
    /// Stop the refresher and wait for it to exit
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Re-resolves tenant catalogs whose refresh interval has elapsed
pub struct CatalogRefresher {
    cache: Arc<CatalogCache>,
    tenants: Arc<dyn TenantDirectory>,
    tick: Duration,
}

impl CatalogRefresher {
    pub fn new(cache: Arc<CatalogCache>, tenants: Arc<dyn TenantDirectory>) -> Self {
        Self {
            cache,
            tenants,
            tick: Duration::from_secs(30),
        }
    }

    /// How often tenants are checked for staleness
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn start(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        let handle = tokio::spawn(async move {
            info!(tick_secs = self.tick.as_secs_f64(), "Catalog refresher started");
            let mut interval = tokio::time::interval(self.tick);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.refresh_stale().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Catalog refresher stopped");
                        break;
                    }
                }
            }
        });

        RefresherHandle {
            shutdown_tx,
            handle,
        }
    }

    async fn refresh_stale(&self) {
        let tenants = match self.tenants.list().await {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to list tenants for catalog refresh: {}", e);
                return;
            }
        };

        for tenant in tenants.iter().filter(|t| self.cache.is_stale(t)) {
            let products = self.cache.refresh(tenant).await;
            if products.is_empty() {
                warn!(tenant = %tenant.id, "Catalog refresh produced no products");
            } else {
                info!(tenant = %tenant.id, count = products.len(), "Catalog refreshed");
            }
        }
    }
}
