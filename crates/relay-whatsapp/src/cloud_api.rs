//! Meta WhatsApp Cloud API client

use async_trait::async_trait;
use relay_core::{MediaRef, MessageIntent, ProviderKind, TemplateParam, WhatsAppConfig};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{Result, WhatsAppError};
use crate::sender::{MessageSender, SendResult, message_id, read_json, require};

const GRAPH_VERSION: &str = "v20.0";

/// WhatsApp Cloud API client
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    client: Client,
    access_token: String,
    phone_number_id: String,
    base_url: String,
}

impl CloudApiClient {
    /// Fails with a configuration error when `accessToken` or
    /// `phoneNumberId` is missing
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let provider = ProviderKind::CloudApi;
        Ok(Self {
            client: Client::new(),
            access_token: require(provider, "accessToken", &config.access_token)?,
            phone_number_id: require(provider, "phoneNumberId", &config.phone_number_id)?,
            base_url: "https://graph.facebook.com".to_string(),
        })
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// JSON body for `POST /{version}/{phone_number_id}/messages`
pub fn build_payload(intent: &MessageIntent) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": intent.to,
        "type": "template",
        "template": template_object(intent),
    })
}

/// `template` object shared with MyOperator, which proxies the Cloud API
pub(crate) fn template_object(intent: &MessageIntent) -> Value {
    let mut components = Vec::new();

    if let Some(header) = &intent.header {
        components.push(json!({
            "type": "header",
            "parameters": [param_json(header)],
        }));
    } else if let Some(media) = &intent.media {
        components.push(json!({
            "type": "header",
            "parameters": [media_json(media)],
        }));
    }

    components.push(json!({
        "type": "body",
        "parameters": intent.parameters.iter().map(param_json).collect::<Vec<_>>(),
    }));

    for (index, payload) in intent.buttons.iter().enumerate() {
        components.push(json!({
            "type": "button",
            "sub_type": "quick_reply",
            "index": index.to_string(),
            "parameters": [{"type": "payload", "payload": payload}],
        }));
    }

    json!({
        "name": intent.template_name(),
        "language": {"code": intent.language},
        "components": components,
    })
}

fn param_json(param: &TemplateParam) -> Value {
    match param {
        TemplateParam::Text { text } => json!({"type": "text", "text": text}),
        TemplateParam::Currency { amount, code } => json!({
            "type": "currency",
            "currency": {
                "fallback_value": param.display_value(),
                "code": code,
                "amount_1000": (amount * 1000.0).round() as i64,
            },
        }),
        TemplateParam::Date { text } => json!({
            "type": "date_time",
            "date_time": {"fallback_value": text},
        }),
    }
}

fn media_json(media: &MediaRef) -> Value {
    let kind = match media.content_type.as_deref() {
        Some(ct) if ct.starts_with("video/") => "video",
        Some(ct) if ct.starts_with("application/") => "document",
        _ => "image",
    };

    let mut param = serde_json::Map::new();
    param.insert("type".to_string(), json!(kind));
    param.insert(kind.to_string(), json!({"link": media.url}));
    Value::Object(param)
}

#[async_trait]
impl MessageSender for CloudApiClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::CloudApi
    }

    async fn send(&self, intent: &MessageIntent) -> Result<SendResult> {
        info!(to = %intent.to, template = %intent.template, "Sending via Cloud API");

        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, GRAPH_VERSION, self.phone_number_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&build_payload(intent))
            .send()
            .await
            .map_err(|e| WhatsAppError::transport(self.provider(), e))?;

        let raw = read_json(self.provider(), response).await?;
        Ok(message_id(raw, "/messages/0/id"))
    }
}
