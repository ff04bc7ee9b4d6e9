//! Simulated sender for tenants without live credentials

use async_trait::async_trait;
use chrono::Utc;
use relay_core::{MessageIntent, ProviderKind};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::sender::{MessageSender, SendResult};

const SIMULATED_LATENCY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct MockSender;

impl MockSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageSender for MockSender {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn send(&self, intent: &MessageIntent) -> Result<SendResult> {
        info!(to = %intent.to, template = %intent.template, "Simulating WhatsApp send");

        tokio::time::sleep(SIMULATED_LATENCY).await;

        let now = Utc::now();
        let id = format!(
            "mock-message-id-{}-{}",
            now.timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        );
        Ok(SendResult {
            success: true,
            provider_message_id: Some(id.clone()),
            raw: json!({
                "success": true,
                "messageId": id,
                "timestamp": now.to_rfc3339(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::TemplateKind;

    #[tokio::test(start_paused = true)]
    async fn test_mock_waits_and_returns_id() {
        let started = tokio::time::Instant::now();
        let result = MockSender::new()
            .send(&MessageIntent::new("+1", TemplateKind::Welcome))
            .await
            .unwrap();

        assert!(started.elapsed() >= SIMULATED_LATENCY);
        assert!(result.success);
        let id = result.provider_message_id.unwrap();
        assert!(id.starts_with("mock-message-id-"));
        assert_eq!(result.raw["messageId"], id.as_str());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_ids_are_unique_within_a_millisecond() {
        let sender = MockSender::new();
        let intent = MessageIntent::new("+1", TemplateKind::Welcome);
        let (a, b) = tokio::join!(sender.send(&intent), sender.send(&intent));

        assert_ne!(
            a.unwrap().provider_message_id,
            b.unwrap().provider_message_id
        );
    }
}
