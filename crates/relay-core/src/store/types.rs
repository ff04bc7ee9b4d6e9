//! Store record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::models::{LineItem, OrderDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Video,
    Document,
    Audio,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Document => "document",
            ContentType::Audio => "audio",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "video" => Ok(ContentType::Video),
            "document" => Ok(ContentType::Document),
            "audio" => Ok(ContentType::Audio),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// Canonical form of a message received through a provider webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub message_id: String,
    pub tenant_id: String,
    pub sender_phone: String,
    pub sender_name: String,
    pub body: String,
    pub content_type: ContentType,
    pub media: Option<String>,
    pub provider: String,
    pub raw: Value,
    pub read: bool,
    pub status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn direction(&self) -> Direction {
        Direction::Incoming
    }
}

/// Record written after every successful send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub message_id: String,
    pub tenant_id: String,
    pub recipient: String,
    pub template_name: String,
    pub provider: String,
    pub status: String,
    pub raw: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn direction(&self) -> Direction {
        Direction::Outgoing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Confirmed,
    Cancelled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Confirmed => "confirmed",
            LeadStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "confirmed" => Ok(LeadStatus::Confirmed),
            "cancelled" => Ok(LeadStatus::Cancelled),
            other => Err(format!("unknown lead status: {}", other)),
        }
    }
}

/// Booking interest detected in an inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLead {
    pub id: String,
    pub tenant_id: String,
    pub customer_phone: String,
    pub customer_name: String,
    pub message: String,
    pub status: LeadStatus,
    pub source: String,
    pub provider: String,
    pub message_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Delayed follow-up produced by a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[serde(rename = "cart_reminder_1")]
    CartReminder1,
    #[serde(rename = "cart_reminder_2")]
    CartReminder2,
    ReviewRequest,
    Upsell,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CartReminder1 => "cart_reminder_1",
            ActionKind::CartReminder2 => "cart_reminder_2",
            ActionKind::ReviewRequest => "review_request",
            ActionKind::Upsell => "upsell",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart_reminder_1" => Ok(ActionKind::CartReminder1),
            "cart_reminder_2" => Ok(ActionKind::CartReminder2),
            "review_request" => Ok(ActionKind::ReviewRequest),
            "upsell" => Ok(ActionKind::Upsell),
            other => Err(format!("unknown action kind: {}", other)),
        }
    }
}

/// Event data captured when an action is armed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cart_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_details: Option<OrderDetails>,
}

/// Row of the durable timer table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAction {
    pub id: String,
    pub tenant_id: String,
    pub customer_phone: String,
    pub kind: ActionKind,
    pub due_at: DateTime<Utc>,
    pub payload: ActionPayload,
    pub created_at: DateTime<Utc>,
}

impl ScheduledAction {
    pub fn new(
        tenant_id: impl Into<String>,
        customer_phone: impl Into<String>,
        kind: ActionKind,
        due_at: DateTime<Utc>,
        payload: ActionPayload,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            customer_phone: customer_phone.into(),
            kind,
            due_at,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Delivery status reported by a provider webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub message_id: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn is_read(&self) -> bool {
        self.status.eq_ignore_ascii_case("read")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_serializes_like_stored_name() {
        for kind in [
            ActionKind::CartReminder1,
            ActionKind::CartReminder2,
            ActionKind::ReviewRequest,
            ActionKind::Upsell,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
            assert_eq!(serde_json::from_value::<ActionKind>(json).unwrap(), kind);
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }
}
