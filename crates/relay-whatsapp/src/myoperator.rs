//! MyOperator WhatsApp API client

use async_trait::async_trait;
use relay_core::{MessageIntent, ProviderKind, WhatsAppConfig};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::cloud_api::template_object;
use crate::error::{Result, WhatsAppError};
use crate::sender::{MessageSender, SendResult, message_id, read_json, require};

#[derive(Debug, Clone)]
pub struct MyOperatorClient {
    client: Client,
    api_key: String,
    phone_number_id: String,
    company_id: String,
    base_url: String,
}

impl MyOperatorClient {
    /// Fails with a configuration error when `apiKey` or `phoneNumberId` is
    /// missing. `companyId` is optional and sent empty when absent.
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let provider = ProviderKind::MyOperator;
        Ok(Self {
            client: Client::new(),
            api_key: require(provider, "apiKey", &config.api_key)?,
            phone_number_id: require(provider, "phoneNumberId", &config.phone_number_id)?,
            company_id: WhatsAppConfig::credential(&config.company_id)
                .unwrap_or_default()
                .to_string(),
            base_url: "https://publicapi.myoperator.co".to_string(),
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
        json!({
            "phone_number_id": self.phone_number_id,
            "to": intent.to.trim_start_matches('+'),
            "type": "template",
            "template": template_object(intent),
        })
    }
}

#[async_trait]
impl MessageSender for MyOperatorClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::MyOperator
    }

    async fn send(&self, intent: &MessageIntent) -> Result<SendResult> {
        info!(to = %intent.to, template = %intent.template, "Sending via MyOperator");

        let url = format!("{}/v1/whatsapp/send", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-MYOP-COMPANY-ID", &self.company_id)
            .json(&self.build_payload(intent))
            .send()
            .await
            .map_err(|e| WhatsAppError::transport(self.provider(), e))?;

        let raw = read_json(self.provider(), response).await?;
        Ok(message_id(raw, "/message_id"))
    }
}
