//! Provider abstraction

use async_trait::async_trait;
use relay_core::{MessageIntent, ProviderKind, WhatsAppConfig};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::cloud_api::CloudApiClient;
use crate::error::{Result, WhatsAppError};
use crate::gupshup::GupshupClient;
use crate::mock::MockSender;
use crate::myoperator::MyOperatorClient;
use crate::twilio::TwilioClient;

/// Normalized outcome of a send
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    /// `None` when a successful response carries no id
    pub provider_message_id: Option<String>,
    /// Provider response body as received
    pub raw: Value,
}

/// Sends message intents through one provider
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// One HTTP call, no retry
    async fn send(&self, intent: &MessageIntent) -> Result<SendResult>;
}

/// Builds the sender for a tenant's WhatsApp configuration
pub trait SenderFactory: Send + Sync {
    fn sender_for(&self, config: &WhatsAppConfig) -> Result<Box<dyn MessageSender>>;
}

/// Provider API base URLs, overridable for tests and proxies
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub cloud_api: String,
    pub twilio: String,
    pub gupshup: String,
    pub myoperator: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            cloud_api: "https://graph.facebook.com".to_string(),
            twilio: "https://api.twilio.com".to_string(),
            gupshup: "https://api.gupshup.io".to_string(),
            myoperator: "https://publicapi.myoperator.co".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every provider pointed at the same base URL
    pub fn all(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            cloud_api: base_url.clone(),
            twilio: base_url.clone(),
            gupshup: base_url.clone(),
            myoperator: base_url,
        }
    }
}

/// Factory selecting the client by `ProviderKind`
#[derive(Debug, Clone, Default)]
pub struct ProviderSenderFactory {
    http: Client,
    endpoints: ProviderEndpoints,
}

impl ProviderSenderFactory {
    pub fn new(http: Client, endpoints: ProviderEndpoints) -> Self {
        Self { http, endpoints }
    }
}

impl SenderFactory for ProviderSenderFactory {
    fn sender_for(&self, config: &WhatsAppConfig) -> Result<Box<dyn MessageSender>> {
        let http = self.http.clone();
        let sender: Box<dyn MessageSender> = match config.provider {
            ProviderKind::CloudApi => Box::new(
                CloudApiClient::new(config)?
                    .with_http_client(http)
                    .with_base_url(&self.endpoints.cloud_api),
            ),
            ProviderKind::Twilio => Box::new(
                TwilioClient::new(config)?
                    .with_http_client(http)
                    .with_base_url(&self.endpoints.twilio),
            ),
            ProviderKind::Gupshup => Box::new(
                GupshupClient::new(config)?
                    .with_http_client(http)
                    .with_base_url(&self.endpoints.gupshup),
            ),
            ProviderKind::MyOperator => Box::new(
                MyOperatorClient::new(config)?
                    .with_http_client(http)
                    .with_base_url(&self.endpoints.myoperator),
            ),
            ProviderKind::Mock => Box::new(MockSender::new()),
        };
        Ok(sender)
    }
}

/// Check that a tenant's provider configuration is complete, without
/// building a client
pub fn validate(config: &WhatsAppConfig) -> Result<()> {
    let provider = config.provider;
    match provider {
        ProviderKind::CloudApi => {
            require(provider, "accessToken", &config.access_token)?;
            require(provider, "phoneNumberId", &config.phone_number_id)?;
        }
        ProviderKind::Twilio => {
            require(provider, "accountSid", &config.account_sid)?;
            require(provider, "authToken", &config.auth_token)?;
            require(provider, "phoneNumber", &config.phone_number)?;
        }
        ProviderKind::Gupshup => {
            require(provider, "apiKey", &config.api_key)?;
            require(provider, "appName", &config.app_name)?;
        }
        ProviderKind::MyOperator => {
            require(provider, "apiKey", &config.api_key)?;
            require(provider, "phoneNumberId", &config.phone_number_id)?;
        }
        ProviderKind::Mock => {}
    }
    Ok(())
}

/// Non-blank credential or a configuration error naming the field
pub(crate) fn require(
    provider: ProviderKind,
    field: &str,
    value: &Option<String>,
) -> Result<String> {
    WhatsAppConfig::credential(value)
        .map(str::to_string)
        .ok_or_else(|| WhatsAppError::configuration(provider, format!("{} is missing", field)))
}

/// Read a provider response: non-2xx or non-JSON bodies become provider errors
pub(crate) async fn read_json(provider: ProviderKind, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WhatsAppError::transport(provider, e))?;

    if !status.is_success() {
        return Err(WhatsAppError::Provider {
            provider,
            status: Some(status.as_u16()),
            raw_body: body,
        });
    }

    serde_json::from_str(&body).map_err(|_| WhatsAppError::Provider {
        provider,
        status: Some(status.as_u16()),
        raw_body: body,
    })
}

/// Successful send result with the message id found at `pointer`, if any
pub(crate) fn message_id(raw: Value, pointer: &str) -> SendResult {
    let provider_message_id = raw
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    SendResult {
        success: true,
        provider_message_id,
        raw,
    }
}
