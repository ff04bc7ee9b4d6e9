//! Tenant-aware dispatch: build the sender, send, record

use chrono::Utc;
use relay_core::{MessageIntent, OutboundMessage, Store, TenantConfig};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::sender::{SendResult, SenderFactory};

/// Sends intents on behalf of a tenant and records successful sends
#[derive(Clone)]
pub struct Dispatcher {
    factory: Arc<dyn SenderFactory>,
    store: Arc<Store>,
}

impl Dispatcher {
    pub fn new(factory: Arc<dyn SenderFactory>, store: Arc<Store>) -> Self {
        Self { factory, store }
    }

    pub async fn send(&self, tenant: &TenantConfig, intent: &MessageIntent) -> Result<SendResult> {
        let sender = self.factory.sender_for(&tenant.whatsapp)?;
        let provider = sender.provider();

        let result = match sender.send(intent).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    tenant = %tenant.id,
                    customer = %intent.to,
                    template = %intent.template,
                    "Send failed: {}",
                    e
                );
                return Err(e);
            }
        };

        info!(
            tenant = %tenant.id,
            customer = %intent.to,
            template = %intent.template,
            provider = %provider,
            message_id = result.provider_message_id.as_deref().unwrap_or("-"),
            "Message sent"
        );

        let message_id = result
            .provider_message_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let now = Utc::now();
        let record = OutboundMessage {
            message_id,
            tenant_id: tenant.id.clone(),
            recipient: intent.to.clone(),
            template_name: intent.template_name().to_string(),
            provider: provider.as_str().to_string(),
            status: "sent".to_string(),
            raw: result.raw.clone(),
            created_at: now,
            updated_at: now,
        };

        // The message is already out; a failed write must not turn it into an error.
        if let Err(e) = self.store.record_outbound(&record) {
            warn!(tenant = %tenant.id, "Failed to record outbound message: {}", e);
        }

        Ok(result)
    }
}
