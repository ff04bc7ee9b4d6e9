//! Event scheduler
//!
//! Turns lifecycle events into immediate sends and delayed actions. Armed
//! actions are rows in the store's `scheduled_actions` table; each one is
//! backed by a sleeping tokio task that claims the row when it wakes.

use chrono::{DateTime, TimeDelta, Utc};
use relay_catalog::CatalogProvider;
use relay_core::intent::builder;
use relay_core::{
    ActionKind, ActionPayload, LineItem, MessageIntent, Product, ScheduledAction, Store,
    TenantConfig, TenantDirectory,
};
use relay_whatsapp::{Dispatcher, SendResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ScheduleError};
use crate::events::{LifecycleEvent, LifecycleEventKind};
use crate::timers::{TimerKey, TimerTable};

/// Action armed while handling an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmedAction {
    pub id: String,
    pub kind: ActionKind,
    pub due_at: DateTime<Utc>,
}

impl From<&ScheduledAction> for ArmedAction {
    fn from(action: &ScheduledAction) -> Self {
        Self {
            id: action.id.clone(),
            kind: action.kind,
            due_at: action.due_at,
        }
    }
}

/// What handling one event did
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    /// Result of the immediate send, if the event has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<SendResult>,
    /// Immediate send failure; delayed actions are still armed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_error: Option<String>,
    pub armed: Vec<ArmedAction>,
}

/// Lifecycle state machine over the durable timer table
#[derive(Clone)]
pub struct EventScheduler {
    tenants: Arc<dyn TenantDirectory>,
    catalog: Arc<dyn CatalogProvider>,
    dispatcher: Dispatcher,
    store: Arc<Store>,
    timers: Arc<TimerTable>,
    clock: Arc<dyn Clock>,
    upsell_delay: Duration,
    arming_enabled: bool,
}

impl EventScheduler {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        catalog: Arc<dyn CatalogProvider>,
        dispatcher: Dispatcher,
        store: Arc<Store>,
    ) -> Self {
        Self {
            tenants,
            catalog,
            dispatcher,
            store,
            timers: Arc::new(TimerTable::new()),
            clock: Arc::new(SystemClock),
            upsell_delay: Duration::from_secs(5),
            arming_enabled: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delay between a review request and its upsell offer
    pub fn with_upsell_delay(mut self, delay: Duration) -> Self {
        self.upsell_delay = delay;
        self
    }

    /// When disabled, events still trigger immediate sends but arm nothing
    pub fn with_arming(mut self, enabled: bool) -> Self {
        self.arming_enabled = enabled;
        self
    }

    /// Handle one lifecycle event for a tenant
    pub async fn handle(
        &self,
        tenant_id: &str,
        kind: LifecycleEventKind,
        event: LifecycleEvent,
    ) -> Result<EventOutcome> {
        let phone = event.validate(kind)?.to_string();

        let tenant = self
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| ScheduleError::TenantNotFound(tenant_id.to_string()))?;

        let received_at = self.clock.now();
        let timings = tenant.timings;
        info!(
            tenant = %tenant.id,
            customer = %phone,
            customer_name = event.customer_name.as_deref().unwrap_or("-"),
            event = %kind,
            "Lifecycle event received"
        );

        let payload = ActionPayload {
            cart_items: event.cart_items.unwrap_or_default(),
            order_details: event.order_details,
        };

        let mut outcome = EventOutcome::default();

        match kind {
            LifecycleEventKind::CartStarted => {
                let due_at = add(received_at, timings.cart_reminder_1_delay());
                let action = self.arm(&tenant, &phone, ActionKind::CartReminder1, due_at, payload)?;
                outcome.armed.extend(action);
            }
            LifecycleEventKind::CartAbandoned => {
                // Not coordinated with a reminder armed by cart-started.
                let intent = builder::cart_reminder_1(&phone, &payload.cart_items, &tenant.brand);
                self.send_now(&tenant, &intent, &mut outcome).await;

                let due_at = add(received_at, timings.cart_reminder_2_delay());
                let action = self.arm(&tenant, &phone, ActionKind::CartReminder2, due_at, payload)?;
                outcome.armed.extend(action);
            }
            LifecycleEventKind::OrderPlaced => {
                if let Some(order) = &payload.order_details {
                    let intent = builder::order_confirmation(&phone, order);
                    self.send_now(&tenant, &intent, &mut outcome).await;
                }
            }
            LifecycleEventKind::OrderDelivered => {
                let due_at = add(received_at, timings.review_delay());
                let action = self.arm(&tenant, &phone, ActionKind::ReviewRequest, due_at, payload)?;
                outcome.armed.extend(action);
            }
        }

        Ok(outcome)
    }

    /// Re-arm every pending row, typically at startup. Overdue actions fire
    /// immediately.
    pub fn restore(&self) -> Result<usize> {
        let pending = self.store.pending_actions()?;
        let count = pending.len();

        for action in pending {
            debug!(
                tenant = %action.tenant_id,
                customer = %action.customer_phone,
                kind = %action.kind,
                due_at = %action.due_at,
                "Restoring scheduled action"
            );
            self.start_timer(action);
        }

        if count > 0 {
            info!(count, "Restored scheduled actions");
        }
        Ok(count)
    }

    /// Armed actions still waiting in the store
    pub fn pending(&self) -> Result<Vec<ScheduledAction>> {
        Ok(self.store.pending_actions()?)
    }

    /// Stop all sleeping timers. Rows are kept and come back with `restore`.
    pub fn shutdown(&self) {
        let sleeping = self.timers.len();
        self.timers.abort_all();
        info!(sleeping, "Event scheduler stopped");
    }

    async fn send_now(&self, tenant: &TenantConfig, intent: &MessageIntent, outcome: &mut EventOutcome) {
        match self.dispatcher.send(tenant, intent).await {
            Ok(result) => outcome.sent = Some(result),
            Err(e) => outcome.send_error = Some(e.to_string()),
        }
    }

    /// Persist the action (superseding its key) and start its timer
    fn arm(
        &self,
        tenant: &TenantConfig,
        phone: &str,
        kind: ActionKind,
        due_at: DateTime<Utc>,
        payload: ActionPayload,
    ) -> Result<Option<ArmedAction>> {
        if !self.arming_enabled {
            debug!(tenant = %tenant.id, customer = %phone, kind = %kind, "Arming disabled, skipping");
            return Ok(None);
        }

        let mut action = ScheduledAction::new(&tenant.id, phone, kind, due_at, payload);
        action.created_at = self.clock.now();
        self.store.upsert_action(&action)?;

        info!(
            tenant = %tenant.id,
            customer = %phone,
            kind = %kind,
            due_at = %due_at.format("%Y-%m-%d %H:%M:%S"),
            "Action armed"
        );

        let armed = ArmedAction::from(&action);
        self.start_timer(action);
        Ok(Some(armed))
    }

    fn start_timer(&self, action: ScheduledAction) {
        let key = TimerKey::from(&action);
        let action_id = action.id.clone();
        let scheduler = self.clone();

        self.timers.arm(key.clone(), action_id, move || {
            tokio::spawn(async move {
                let delay = (action.due_at - scheduler.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                tokio::time::sleep(delay).await;

                if !scheduler.timers.release(&key, &action.id) {
                    return;
                }
                scheduler.fire(action).await;
            })
            .abort_handle()
        });
    }

    async fn fire(&self, action: ScheduledAction) {
        match self.store.claim_action(&action.id) {
            Ok(true) => {}
            Ok(false) => {
                debug!(kind = %action.kind, id = %action.id, "Action superseded, skipping");
                return;
            }
            Err(e) => {
                error!(kind = %action.kind, id = %action.id, "Failed to claim action: {}", e);
                return;
            }
        }

        let tenant = match self.tenants.get(&action.tenant_id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                warn!(tenant = %action.tenant_id, kind = %action.kind, "Tenant gone, dropping action");
                return;
            }
            Err(e) => {
                error!(tenant = %action.tenant_id, "Failed to load tenant: {}", e);
                return;
            }
        };

        info!(
            tenant = %tenant.id,
            customer = %action.customer_phone,
            kind = %action.kind,
            "Firing scheduled action"
        );

        let phone = action.customer_phone.as_str();
        let intent = match action.kind {
            ActionKind::CartReminder1 => {
                let catalog = self.catalog.resolve(&tenant).await;
                let items = refresh_items(&action.payload.cart_items, &catalog);
                Some(builder::cart_reminder_1(phone, &items, &tenant.brand))
            }
            ActionKind::CartReminder2 => Some(builder::cart_reminder_2(phone, &tenant.brand)),
            ActionKind::ReviewRequest => action
                .payload
                .order_details
                .as_ref()
                .map(|order| builder::review_request(phone, order)),
            ActionKind::Upsell => {
                let catalog = self.catalog.resolve(&tenant).await;
                let intent = action
                    .payload
                    .order_details
                    .as_ref()
                    .and_then(|order| builder::upsell(phone, order, &catalog));
                if intent.is_none() {
                    warn!(tenant = %tenant.id, customer = %phone, "No upsell candidate in catalog");
                }
                intent
            }
        };

        // Fire-time failures are final: no retry, no re-arm.
        if let Some(intent) = intent {
            if let Err(e) = self.dispatcher.send(&tenant, &intent).await {
                warn!(
                    tenant = %tenant.id,
                    customer = %phone,
                    kind = %action.kind,
                    "Scheduled send dropped: {}",
                    e
                );
            }
        }

        // The upsell delay counts from the end of the review send.
        if action.kind == ActionKind::ReviewRequest {
            let due_at = add(self.clock.now(), self.upsell_delay);
            if let Err(e) = self.arm(&tenant, phone, ActionKind::Upsell, due_at, action.payload.clone()) {
                error!(tenant = %tenant.id, customer = %phone, "Failed to arm upsell: {}", e);
            }
        }
    }
}

fn add(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Cart items with names taken from the current catalog where ids match
fn refresh_items(items: &[LineItem], catalog: &[Product]) -> Vec<LineItem> {
    items
        .iter()
        .map(|item| {
            let current = item
                .id
                .as_ref()
                .and_then(|id| catalog.iter().find(|p| &p.id == id));
            match current {
                Some(product) => LineItem {
                    name: product.name.clone(),
                    ..item.clone()
                },
                None => item.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ExternalId;

    #[test]
    fn test_refresh_items_uses_catalog_names() {
        let items = vec![
            LineItem::new(1, "Ocean View", 299.0),
            LineItem {
                id: None,
                name: "Gift card".into(),
                price: None,
                quantity: None,
            },
        ];
        let catalog = vec![Product {
            id: ExternalId::Number(1),
            name: "Ocean View Suite".into(),
            price: 319.0,
            benefit: String::new(),
            category: "accommodation".into(),
            url: None,
            image_url: None,
        }];

        let refreshed = refresh_items(&items, &catalog);
        assert_eq!(refreshed[0].name, "Ocean View Suite");
        assert_eq!(refreshed[0].price, Some(299.0));
        assert_eq!(refreshed[1].name, "Gift card");
    }

    #[test]
    fn test_add_saturates() {
        let now = Utc::now();
        assert_eq!(add(now, Duration::from_secs(60)) - now, TimeDelta::seconds(60));
        assert_eq!(add(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
