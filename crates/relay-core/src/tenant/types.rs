//! Tenant configuration types
//!
//! Tenant files use the camelCase layout written by the settings UI, so
//! every struct here renames its fields accordingly. Credential fields are
//! optional and empty strings count as missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::models::Product;

/// One resort/business account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub id: String,
    #[serde(default)]
    pub brand: BrandConfig,
    #[serde(default)]
    pub timings: TimingPolicy,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_api: Option<ProductApiConfig>,
    /// Static catalog, used whenever the product API is disabled or failing
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TenantConfig {
    /// Tenant with default brand, timings and the mock provider
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            brand: BrandConfig::default(),
            timings: TimingPolicy::default(),
            whatsapp: WhatsAppConfig::default(),
            product_api: None,
            products: Vec::new(),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Link placed in cart reminders
    #[serde(default = "default_booking_url")]
    pub booking_url: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            tone: default_tone(),
            booking_url: default_booking_url(),
        }
    }
}

fn default_tone() -> String {
    "friendly".to_string()
}

fn default_booking_url() -> String {
    "https://yourresort.com/booking".to_string()
}

/// Messaging delays, captured when an event arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingPolicy {
    #[serde(default = "default_reminder1_minutes")]
    pub cart_reminder1_minutes: u64,
    #[serde(default = "default_reminder2_hours")]
    pub cart_reminder2_hours: u64,
    #[serde(default = "default_review_days")]
    pub post_purchase_review_days: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            cart_reminder1_minutes: default_reminder1_minutes(),
            cart_reminder2_hours: default_reminder2_hours(),
            post_purchase_review_days: default_review_days(),
        }
    }
}

fn default_reminder1_minutes() -> u64 {
    60
}

fn default_reminder2_hours() -> u64 {
    24
}

fn default_review_days() -> u64 {
    3
}

impl TimingPolicy {
    pub fn cart_reminder_1_delay(&self) -> Duration {
        Duration::from_secs(self.cart_reminder1_minutes.saturating_mul(60))
    }

    pub fn cart_reminder_2_delay(&self) -> Duration {
        Duration::from_secs(self.cart_reminder2_hours.saturating_mul(60 * 60))
    }

    pub fn review_delay(&self) -> Duration {
        Duration::from_secs(self.post_purchase_review_days.saturating_mul(24 * 60 * 60))
    }
}

/// WhatsApp provider selected by a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    CloudApi,
    Twilio,
    Gupshup,
    MyOperator,
    /// No live credentials; sends are simulated
    #[default]
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CloudApi => "whatsapp-cloud-api",
            ProviderKind::Twilio => "twilio",
            ProviderKind::Gupshup => "gupshup",
            ProviderKind::MyOperator => "myoperator",
            ProviderKind::Mock => "mock",
        }
    }

    /// Parse a provider name, `None` for unknown names
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "whatsapp-cloud-api" | "cloud-api" | "meta" => Some(ProviderKind::CloudApi),
            "twilio" => Some(ProviderKind::Twilio),
            "gupshup" => Some(ProviderKind::Gupshup),
            "myoperator" => Some(ProviderKind::MyOperator),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }
}

impl From<String> for ProviderKind {
    // Unknown or empty provider names fall back to the mock sender.
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(ProviderKind::Mock)
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider selection plus every provider's credential fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    // Cloud API (also phone_number_id for MyOperator)
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub business_account_id: Option<String>,

    // Twilio
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Template name -> Twilio content SID
    #[serde(default)]
    pub content_sids: HashMap<String, String>,

    // Gupshup / MyOperator
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,

    #[serde(default)]
    pub verify_token: Option<String>,
}

impl WhatsAppConfig {
    /// Returns the value when present and non-blank
    pub fn credential(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// MyOperator identifies the receiving number by `phone_number_id`
    pub fn matches_phone_number_id(&self, id: &str) -> bool {
        Self::credential(&self.phone_number_id) == Some(id)
            || Self::credential(&self.phone_number) == Some(id)
    }

    /// Twilio identifies the receiving number by `To`; `whatsapp:` and `+`
    /// are ignored on both sides.
    pub fn matches_business_phone(&self, phone: &str) -> bool {
        fn normalize(p: &str) -> String {
            p.replace("whatsapp:", "").replace('+', "").trim().to_string()
        }

        match Self::credential(&self.phone_number) {
            Some(own) => normalize(own) == normalize(phone),
            None => false,
        }
    }
}

/// Authentication used when fetching the tenant's product API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Bearer,
    Basic,
    #[serde(rename = "apikey")]
    ApiKey,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key_header: Option<String>,
    #[serde(default)]
    pub api_key_value: Option<String>,
    /// Minutes between catalog refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: f64,
}

fn default_refresh_interval() -> f64 {
    60.0
}

impl Default for ProductApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            auth_type: AuthType::None,
            bearer_token: None,
            username: None,
            password: None,
            api_key_header: None,
            api_key_value: None,
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl ProductApiConfig {
    /// Enabled with a non-empty URL
    pub fn is_active(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }

    pub fn refresh_period(&self) -> Duration {
        let minutes = if self.refresh_interval.is_finite() && self.refresh_interval > 0.0 {
            self.refresh_interval
        } else {
            default_refresh_interval()
        };
        Duration::try_from_secs_f64(minutes * 60.0)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_refresh_interval() * 60.0))
    }
}
