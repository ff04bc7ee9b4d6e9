//! Tenant configuration and lookup

mod directory;
mod types;

pub use directory::{FileTenantDirectory, InMemoryTenantDirectory, TenantDirectory};
pub use types::{
    AuthType, BrandConfig, ProductApiConfig, ProviderKind, TenantConfig, TimingPolicy,
    WhatsAppConfig,
};
