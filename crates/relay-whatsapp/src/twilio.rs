//! Twilio API client for WhatsApp

use async_trait::async_trait;
use relay_core::{MessageIntent, ProviderKind, WhatsAppConfig};
use reqwest::Client;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::error::{Result, WhatsAppError};
use crate::sender::{MessageSender, SendResult, message_id, read_json, require};

/// Twilio API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    phone_number: String,
    content_sids: HashMap<String, String>,
    base_url: String,
}

/// Form body for `Messages.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendMessagePayload {
    pub from: String,
    pub to: String,
    pub body: String,
    pub content_variables: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl TwilioClient {
    /// Fails with a configuration error when `accountSid`, `authToken` or
    /// `phoneNumber` is missing
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let provider = ProviderKind::Twilio;
        Ok(Self {
            client: Client::new(),
            account_sid: require(provider, "accountSid", &config.account_sid)?,
            auth_token: require(provider, "authToken", &config.auth_token)?,
            phone_number: require(provider, "phoneNumber", &config.phone_number)?,
            content_sids: config.content_sids.clone(),
            base_url: "https://api.twilio.com".to_string(),
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

    /// Form fields for an intent
    pub fn build_payload(&self, intent: &MessageIntent) -> SendMessagePayload {
        // Twilio numbers content variables from "1"
        let variables: BTreeMap<String, String> = intent
            .display_values()
            .into_iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v))
            .collect();

        SendMessagePayload {
            from: whatsapp_address(&self.phone_number),
            to: whatsapp_address(&intent.to),
            body: intent.fallback_text(),
            content_variables: serde_json::to_string(&variables).unwrap_or_else(|_| "{}".into()),
            content_sid: self.content_sids.get(intent.template_name()).cloned(),
            media_url: intent.media.as_ref().map(|m| m.url.clone()),
        }
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl MessageSender for TwilioClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Twilio
    }

    async fn send(&self, intent: &MessageIntent) -> Result<SendResult> {
        info!(to = %intent.to, template = %intent.template, "Sending via Twilio");

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.build_payload(intent))
            .send()
            .await
            .map_err(|e| WhatsAppError::transport(self.provider(), e))?;

        let raw = read_json(self.provider(), response).await?;
        Ok(message_id(raw, "/sid"))
    }
}
