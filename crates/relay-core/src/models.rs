//! Catalog and order models shared by the catalog resolver, the intent
//! builders and the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier coming from a tenant's website; numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Number(n) => write!(f, "{}", n),
            ExternalId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(n: i64) -> Self {
        ExternalId::Number(n)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        ExternalId::Text(s.to_string())
    }
}

/// Order total as sent by the website: a number, or preformatted text
/// such as `"$799.98"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Number(0.0)
    }
}

impl From<f64> for Amount {
    fn from(n: f64) -> Self {
        Amount::Number(n)
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Amount::Text(s.to_string())
    }
}

/// Product or accommodation offered by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ExternalId,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    /// Short selling point shown in suggestion templates
    #[serde(default)]
    pub benefit: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    pub fn is_experience(&self) -> bool {
        self.category.eq_ignore_ascii_case("experience")
    }
}

/// Item inside a cart or an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExternalId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl LineItem {
    pub fn new(id: impl Into<ExternalId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            price: Some(price),
            quantity: None,
        }
    }
}

/// Order details attached to `order-placed` and `order-delivered` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: ExternalId,
    #[serde(default)]
    pub total_amount: Amount,
    /// ISO-4217 code, `USD` when the website omits it
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub estimated_delivery: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

fn default_currency() -> String {
    "USD".to_string()
}
