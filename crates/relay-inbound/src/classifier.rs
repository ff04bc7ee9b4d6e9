//! Inbound message classification
//!
//! Normalizes a provider webhook, stores the canonical message and opens a
//! booking lead when the text shows booking interest. Nothing here sends.

use chrono::Utc;
use relay_core::{BookingLead, InboundMessage, LeadStatus, Store};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::payload::{self, InboundProvider};

/// Outcome of one message webhook
#[derive(Debug, Clone)]
pub struct Classified {
    pub message: InboundMessage,
    /// Lead opened by this message, `None` when no keyword matched or the
    /// customer already has a new lead
    pub lead: Option<BookingLead>,
}

#[derive(Clone)]
pub struct Classifier {
    store: Arc<Store>,
}

impl Classifier {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Classify and persist a message webhook for `tenant_id`.
    ///
    /// Returns `Ok(None)` for events that are not incoming messages.
    pub fn classify(
        &self,
        tenant_id: &str,
        provider: InboundProvider,
        raw: Value,
    ) -> Result<Option<Classified>> {
        let Some(normalized) = payload::normalize(provider, &raw)? else {
            debug!(tenant = %tenant_id, provider = %provider, "Skipping non-incoming event");
            return Ok(None);
        };

        let now = Utc::now();
        let message = InboundMessage {
            message_id: normalized.message_id,
            tenant_id: tenant_id.to_string(),
            sender_phone: normalized.sender_phone,
            sender_name: normalized.sender_name,
            body: normalized.body,
            content_type: normalized.content_type,
            media: normalized.media,
            provider: provider.as_str().to_string(),
            raw,
            read: false,
            status: normalized.status,
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert_inbound(&message)?;
        info!(
            tenant = %tenant_id,
            provider = %provider,
            message_id = %message.message_id,
            content_type = message.content_type.as_str(),
            "Inbound message stored"
        );

        let lead = if provider.is_booking_intent(&message.body) {
            self.open_lead(provider, &message)?
        } else {
            None
        };

        Ok(Some(Classified { message, lead }))
    }

    /// Apply a status webhook. Unknown message ids are a logged no-op and
    /// return `false`.
    pub fn apply_status(&self, tenant_id: &str, provider: InboundProvider, raw: &Value) -> Result<bool> {
        let update = payload::parse_status(provider, raw)?;
        let applied = self.store.apply_status(tenant_id, &update)?;

        if applied {
            info!(
                tenant = %tenant_id,
                provider = %provider,
                message_id = %update.message_id,
                status = %update.status,
                "Message status updated"
            );
        } else {
            warn!(
                tenant = %tenant_id,
                provider = %provider,
                message_id = %update.message_id,
                "Status for unknown message"
            );
        }
        Ok(applied)
    }

    fn open_lead(&self, provider: InboundProvider, message: &InboundMessage) -> Result<Option<BookingLead>> {
        let now = Utc::now();
        let lead = BookingLead {
            id: format!("lead_{}", uuid::Uuid::new_v4().simple()),
            tenant_id: message.tenant_id.clone(),
            customer_phone: message.sender_phone.clone(),
            customer_name: message.sender_name.clone(),
            message: message.body.clone(),
            status: LeadStatus::New,
            source: "whatsapp".to_string(),
            provider: provider.as_str().to_string(),
            message_id: message.message_id.clone(),
            created_at: now,
            updated_at: now,
        };

        if self.store.create_lead_if_absent(&lead)? {
            info!(
                tenant = %lead.tenant_id,
                customer = %lead.customer_phone,
                lead_id = %lead.id,
                "Booking lead created"
            );
            Ok(Some(lead))
        } else {
            debug!(
                tenant = %lead.tenant_id,
                customer = %lead.customer_phone,
                "Booking lead already open"
            );
            Ok(None)
        }
    }
}
