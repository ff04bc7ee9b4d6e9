//! Gupshup template API client

use async_trait::async_trait;
use relay_core::{MessageIntent, ProviderKind, WhatsAppConfig};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{Result, WhatsAppError};
use crate::sender::{MessageSender, SendResult, message_id, read_json, require};

#[derive(Debug, Clone)]
pub struct GupshupClient {
    client: Client,
    api_key: String,
    app_name: String,
    base_url: String,
}

impl GupshupClient {
    /// Fails with a configuration error when `apiKey` or `appName` is missing
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let provider = ProviderKind::Gupshup;
        Ok(Self {
            client: Client::new(),
            api_key: require(provider, "apiKey", &config.api_key)?,
            app_name: require(provider, "appName", &config.app_name)?,
            base_url: "https://api.gupshup.io".to_string(),
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

    pub fn build_payload(&self, intent: &MessageIntent) -> Value {
        let mut payload = json!({
            "source": self.app_name,
            "destination": intent.to,
            "template": {
                "id": intent.template_name(),
                "params": intent.display_values(),
            },
        });

        if let Some(media) = &intent.media {
            payload["message"] = json!({"type": "image", "image": {"link": media.url}});
        }

        payload
    }
}

#[async_trait]
impl MessageSender for GupshupClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gupshup
    }

    async fn send(&self, intent: &MessageIntent) -> Result<SendResult> {
        info!(to = %intent.to, template = %intent.template, "Sending via Gupshup");

        let url = format!("{}/sm/api/v1/template/msg", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&self.build_payload(intent))
            .send()
            .await
            .map_err(|e| WhatsAppError::transport(self.provider(), e))?;

        let raw = read_json(self.provider(), response).await?;
        Ok(message_id(raw, "/messageId"))
    }
}
