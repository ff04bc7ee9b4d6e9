//! relay-core: shared building blocks for wa-relay
//!
//! Configuration, tenant records, catalog/order models, provider-agnostic
//! message intents and the SQLite store used for messages, leads and
//! scheduled actions.

pub mod config;
pub mod error;
pub mod intent;
pub mod models;
pub mod store;
pub mod tenant;

pub use config::{CatalogSettings, Config, SchedulerSettings, ServerConfig, StorageConfig, TenantsConfig};
pub use error::{Error, Result};
pub use intent::{MediaRef, MessageIntent, TemplateKind, TemplateParam};
pub use models::{Amount, ExternalId, LineItem, OrderDetails, Product};
pub use store::{
    ActionKind, ActionPayload, BookingLead, ContentType, Direction, InboundMessage, LeadStatus,
    OutboundMessage, ScheduledAction, StatusUpdate, Store,
};
pub use tenant::{
    AuthType, BrandConfig, FileTenantDirectory, InMemoryTenantDirectory, ProductApiConfig,
    ProviderKind, TenantConfig, TenantDirectory, TimingPolicy, WhatsAppConfig,
};
