//! Provider webhook payloads
//!
//! MyOperator posts nested JSON; Twilio posts flat form fields, which the
//! HTTP layer turns into a JSON object of strings before handing it here.

use chrono::{DateTime, Utc};
use relay_core::{ContentType, StatusUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{InboundError, Result};

/// Providers that deliver inbound webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundProvider {
    MyOperator,
    Twilio,
}

const COMMON_KEYWORDS: &[&str] = &[
    "book",
    "reservation",
    "room",
    "pg",
    "stay",
    "available",
    "price",
    "cost",
];

impl InboundProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboundProvider::MyOperator => "myoperator",
            InboundProvider::Twilio => "twilio",
        }
    }

    /// Booking keywords, matched as lowercase substrings
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> {
        let extra: &'static [&'static str] = match self {
            InboundProvider::MyOperator => &[],
            InboundProvider::Twilio => &["rent"],
        };
        COMMON_KEYWORDS.iter().chain(extra).copied()
    }

    /// Whether `text` expresses booking interest
    pub fn is_booking_intent(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords().any(|k| text.contains(k))
    }

    /// Business-side identifier used to route a message webhook to a tenant:
    /// MyOperator `data.phone_number_id`, Twilio `To`
    pub fn business_identifier<'a>(&self, raw: &'a Value) -> Option<&'a str> {
        match self {
            InboundProvider::MyOperator => text(raw.pointer("/data/phone_number_id")),
            InboundProvider::Twilio => text(raw.get("To")),
        }
    }

    /// Message id carried by a status webhook
    pub fn status_message_id<'a>(&self, raw: &'a Value) -> Option<&'a str> {
        match self {
            InboundProvider::MyOperator => text(raw.get("message_id")),
            InboundProvider::Twilio => text(raw.get("MessageSid")),
        }
    }
}

impl fmt::Display for InboundProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboundProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "myoperator" => Ok(InboundProvider::MyOperator),
            "twilio" => Ok(InboundProvider::Twilio),
            other => Err(format!("unknown inbound provider: {}", other)),
        }
    }
}

/// Provider-independent fields of an inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub message_id: String,
    pub sender_phone: String,
    pub sender_name: String,
    pub body: String,
    pub content_type: ContentType,
    pub media: Option<String>,
    pub status: String,
}

/// Normalize a message webhook. `Ok(None)` for MyOperator events that are
/// not incoming messages.
pub fn normalize(provider: InboundProvider, raw: &Value) -> Result<Option<NormalizedMessage>> {
    match provider {
        InboundProvider::MyOperator => normalize_myoperator(raw),
        InboundProvider::Twilio => Ok(Some(normalize_twilio(raw))),
    }
}

fn normalize_myoperator(raw: &Value) -> Result<Option<NormalizedMessage>> {
    let data = raw
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| InboundError::Malformed {
            provider: "myoperator",
            message: "no data in webhook".into(),
        })?;

    if text(data.get("action")) != Some("incoming") {
        return Ok(None);
    }

    let (sender_phone, sender_name) = match data.get("conversation") {
        Some(conversation) => {
            let phone = format!(
                "{}{}",
                scalar(conversation.get("customer_country_code")).unwrap_or_default(),
                scalar(conversation.get("customer_contact")).unwrap_or_default(),
            );
            let name = text(conversation.get("customer_name")).unwrap_or("Unknown");
            (phone, name.to_string())
        }
        None => ("unknown".to_string(), "Unknown".to_string()),
    };

    let message = data.get("data");
    let kind = message
        .and_then(|m| text(m.get("type")))
        .unwrap_or("text");
    let context = message.and_then(|m| m.get("context"));
    let field = |name: &str| context.and_then(|c| text(c.get(name)));
    let media_ref = || field("link").or_else(|| field("id")).map(str::to_string);

    let (content_type, body, media) = match kind {
        "image" => (
            ContentType::Image,
            field("caption").unwrap_or("Image received"),
            media_ref(),
        ),
        "video" => (
            ContentType::Video,
            field("caption").unwrap_or("Video received"),
            media_ref(),
        ),
        "document" => (
            ContentType::Document,
            field("caption")
                .or_else(|| field("filename"))
                .unwrap_or("Document received"),
            media_ref(),
        ),
        "audio" => (ContentType::Audio, "", media_ref()),
        _ => (ContentType::Text, field("body").unwrap_or(""), None),
    };

    Ok(Some(NormalizedMessage {
        message_id: text(data.get("id"))
            .map(str::to_string)
            .unwrap_or_else(generated_id),
        sender_phone,
        sender_name,
        body: body.to_string(),
        content_type,
        media,
        status: text(data.get("status")).unwrap_or("received").to_string(),
    }))
}

fn normalize_twilio(raw: &Value) -> NormalizedMessage {
    let field = |name: &str| text(raw.get(name));

    let num_media = field("NumMedia")
        .and_then(|n| n.trim().parse::<u32>().ok())
        .unwrap_or(0);

    let (content_type, media) = if num_media > 0 {
        let mime = field("MediaContentType0").unwrap_or_default();
        let content_type = if mime.starts_with("image/") {
            ContentType::Image
        } else if mime.starts_with("video/") {
            ContentType::Video
        } else if mime.starts_with("audio/") {
            ContentType::Audio
        } else {
            ContentType::Document
        };
        (content_type, field("MediaUrl0").map(str::to_string))
    } else {
        (ContentType::Text, None)
    };

    NormalizedMessage {
        message_id: field("MessageSid")
            .map(str::to_string)
            .unwrap_or_else(generated_id),
        sender_phone: field("From")
            .map(|from| from.replace("whatsapp:", ""))
            .unwrap_or_else(|| "unknown".to_string()),
        sender_name: field("ProfileName").unwrap_or("Unknown").to_string(),
        body: field("Body").unwrap_or_default().to_string(),
        content_type,
        media,
        status: "received".to_string(),
    }
}

/// Parse a status webhook into a store update
pub fn parse_status(provider: InboundProvider, raw: &Value) -> Result<StatusUpdate> {
    let message_id = provider
        .status_message_id(raw)
        .ok_or(InboundError::MissingField(match provider {
            InboundProvider::MyOperator => "message_id",
            InboundProvider::Twilio => "MessageSid",
        }))?
        .to_string();

    let update = match provider {
        InboundProvider::MyOperator => StatusUpdate {
            message_id,
            status: text(raw.get("status")).unwrap_or("unknown").to_string(),
            timestamp: scalar(raw.get("timestamp"))
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            error_code: None,
            error_message: None,
        },
        InboundProvider::Twilio => {
            let error_code = text(raw.get("ErrorCode")).map(str::to_string);
            let error_message = error_code.as_ref().map(|_| {
                text(raw.get("ErrorMessage"))
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            StatusUpdate {
                message_id,
                status: text(raw.get("MessageStatus")).unwrap_or("unknown").to_string(),
                timestamp: None,
                error_code,
                error_message,
            }
        }
    };

    Ok(update)
}

/// Non-empty string field
fn text(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String or number field rendered as text
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn generated_id() -> String {
    format!("msg_{}", Utc::now().timestamp_millis())
}
