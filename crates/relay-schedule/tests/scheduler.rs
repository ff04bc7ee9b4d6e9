use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use relay_catalog::CatalogResolver;
use relay_core::{
    ActionKind, ActionPayload, ExternalId, InMemoryTenantDirectory, LineItem, MessageIntent,
    OrderDetails, Product, ProviderKind, ScheduledAction, Store, TemplateKind, TemplateParam,
    TenantConfig, WhatsAppConfig,
};
use relay_schedule::{
    Clock, EventScheduler, LifecycleEvent, LifecycleEventKind, ScheduleError, TokioClock,
};
use relay_whatsapp::{
    Dispatcher, MessageSender, Result as SendOutcome, SendResult, SenderFactory, WhatsAppError,
};
use serde_json::json;

/// A send as seen by the provider, plus the action kinds pending at that moment
#[derive(Debug, Clone)]
struct Sent {
    intent: MessageIntent,
    pending: Vec<ActionKind>,
}

#[derive(Clone)]
struct Recorder {
    store: Arc<Store>,
    sent: Arc<Mutex<Vec<Sent>>>,
    /// "start <template>" / "done <template>" in order
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
    latency: Duration,
}

impl Recorder {
    fn new(store: Arc<Store>, fail: bool) -> Self {
        Self {
            store,
            sent: Arc::new(Mutex::new(Vec::new())),
            log: Arc::new(Mutex::new(Vec::new())),
            fail,
            latency: Duration::ZERO,
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for Recorder {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn send(&self, intent: &MessageIntent) -> SendOutcome<SendResult> {
        let pending = self
            .store
            .pending_actions()
            .unwrap()
            .into_iter()
            .map(|a| a.kind)
            .collect();
        self.sent.lock().unwrap().push(Sent {
            intent: intent.clone(),
            pending,
        });
        self.log.lock().unwrap().push(format!("start {}", intent.template_name()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.log.lock().unwrap().push(format!("done {}", intent.template_name()));

        if self.fail {
            return Err(WhatsAppError::Provider {
                provider: ProviderKind::Mock,
                status: Some(500),
                raw_body: "boom".into(),
            });
        }
        Ok(SendResult {
            success: true,
            provider_message_id: Some(format!("rec-{}", self.sent.lock().unwrap().len())),
            raw: json!({}),
        })
    }
}

impl SenderFactory for Recorder {
    fn sender_for(&self, _config: &WhatsAppConfig) -> SendOutcome<Box<dyn MessageSender>> {
        Ok(Box::new(self.clone()))
    }
}

fn product(id: i64, name: &str, price: f64, category: &str) -> Product {
    Product {
        id: ExternalId::Number(id),
        name: name.into(),
        price,
        benefit: String::new(),
        category: category.into(),
        url: None,
        image_url: None,
    }
}

fn tenant() -> TenantConfig {
    let mut tenant = TenantConfig::new("sunset");
    tenant.brand.name = "Sunset Resort".into();
    tenant.timings.cart_reminder1_minutes = 1;
    tenant.timings.cart_reminder2_hours = 24;
    tenant.timings.post_purchase_review_days = 1;
    tenant.products = vec![
        product(1, "Ocean View Suite", 299.0, "accommodation"),
        product(7, "Sunset Kayak Tour", 89.0, "experience"),
    ];
    tenant
}

struct Harness {
    scheduler: EventScheduler,
    store: Arc<Store>,
    tenants: Arc<InMemoryTenantDirectory>,
    recorder: Recorder,
    clock: TokioClock,
}

fn harness_from(store: Arc<Store>, recorder: Recorder) -> Harness {
    let clock = TokioClock::new();
    let tenants = Arc::new(InMemoryTenantDirectory::with_tenants([tenant()]));
    let dispatcher = Dispatcher::new(Arc::new(recorder.clone()), store.clone());

    let scheduler = EventScheduler::new(
        tenants.clone(),
        Arc::new(CatalogResolver::default()),
        dispatcher,
        store.clone(),
    )
    .with_clock(Arc::new(clock));

    Harness {
        scheduler,
        store,
        tenants,
        recorder,
        clock,
    }
}

fn harness_with(store: Arc<Store>, fail: bool) -> Harness {
    let recorder = Recorder::new(store.clone(), fail);
    harness_from(store, recorder)
}

fn harness() -> Harness {
    harness_with(Arc::new(Store::in_memory().unwrap()), false)
}

fn cart_event(item_name: &str) -> LifecycleEvent {
    LifecycleEvent {
        customer_phone: Some("+15550001111".into()),
        customer_name: Some("Ana".into()),
        cart_items: Some(vec![LineItem::new(1, item_name, 299.0)]),
        order_details: None,
    }
}

fn order_event() -> LifecycleEvent {
    LifecycleEvent {
        customer_phone: Some("+15550001111".into()),
        order_details: Some(OrderDetails {
            order_id: ExternalId::Text("ORD-1001".into()),
            total_amount: 598.5.into(),
            currency: "USD".into(),
            estimated_delivery: "2024-06-01".into(),
            items: vec![LineItem::new(1, "Ocean View Suite", 299.25)],
        }),
        ..Default::default()
    }
}

fn pending_kinds(store: &Store) -> Vec<ActionKind> {
    store
        .pending_actions()
        .unwrap()
        .into_iter()
        .map(|a| a.kind)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_cart_started_reminds_after_delay_with_current_names() {
    let h = harness();

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap();
    assert!(outcome.sent.is_none());
    assert_eq!(outcome.armed.len(), 1);
    assert_eq!(outcome.armed[0].kind, ActionKind::CartReminder1);

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(h.recorder.sent().is_empty());
    assert_eq!(pending_kinds(&h.store), vec![ActionKind::CartReminder1]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.template, TemplateKind::CartReminder1);
    assert_eq!(sent[0].intent.parameters[0], TemplateParam::text("Ocean View Suite"));
    assert_eq!(sent[0].intent.parameters[1], TemplateParam::text("Sunset Resort"));
    assert!(pending_kinds(&h.store).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cart_abandoned_sends_then_arms_second_reminder() {
    let h = harness();
    let received_at = h.clock.now();

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartAbandoned, cart_event("Ocean View Suite"))
        .await
        .unwrap();

    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.template, TemplateKind::CartReminder1);
    // Nothing was armed yet when the first reminder went out
    assert!(sent[0].pending.is_empty());

    assert!(outcome.sent.is_some());
    assert_eq!(outcome.armed.len(), 1);
    assert_eq!(outcome.armed[0].kind, ActionKind::CartReminder2);
    assert_eq!(outcome.armed[0].due_at - received_at, TimeDelta::hours(24));

    tokio::time::sleep(Duration::from_secs(24 * 3600 + 1)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].intent.template, TemplateKind::CartReminder2);
    assert_eq!(sent[1].intent.parameters, vec![TemplateParam::text("Sunset Resort")]);
}

#[tokio::test(start_paused = true)]
async fn test_order_placed_confirms_immediately() {
    let h = harness();

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::OrderPlaced, order_event())
        .await
        .unwrap();

    assert!(outcome.armed.is_empty());
    assert_eq!(outcome.sent.unwrap().provider_message_id.as_deref(), Some("rec-1"));
    let sent = h.recorder.sent();
    assert_eq!(sent[0].intent.template, TemplateKind::OrderConfirmation);
    assert_eq!(
        sent[0].intent.display_values(),
        vec!["ORD-1001", "$598.50", "2024-06-01"]
    );
    assert_eq!(h.store.list_outbound("sunset").unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_review_request_chains_upsell() {
    let h = harness();

    h.scheduler
        .handle("sunset", LifecycleEventKind::OrderDelivered, order_event())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 3600 - 1)).await;
    assert!(h.recorder.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.template, TemplateKind::ReviewRequest);
    assert_eq!(sent[0].intent.parameters, vec![TemplateParam::text("Ocean View Suite")]);
    // Review row claimed, upsell not armed until the send returns
    assert!(sent[0].pending.is_empty());
    assert_eq!(pending_kinds(&h.store), vec![ActionKind::Upsell]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].intent.template, TemplateKind::Upsell);
    assert_eq!(sent[1].intent.parameters[1], TemplateParam::text("Sunset Kayak Tour"));
    assert_eq!(sent[1].intent.buttons, vec!["VIEW_7"]);
    assert!(pending_kinds(&h.store).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_upsell_delay_counts_from_review_send_completion() {
    let store = Arc::new(Store::in_memory().unwrap());
    let recorder = Recorder::new(store.clone(), false).with_latency(Duration::from_secs(10));
    let h = harness_from(store, recorder);

    h.scheduler
        .handle("sunset", LifecycleEventKind::OrderDelivered, order_event())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 3600 + 1)).await;
    assert_eq!(h.recorder.log(), vec!["start post_purchase_review"]);

    // Review finishes at +10 s, upsell is due 5 s later
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(h.recorder.log(), vec!["start post_purchase_review", "done post_purchase_review"]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        h.recorder.log(),
        vec![
            "start post_purchase_review",
            "done post_purchase_review",
            "start upsell_offer",
            "done upsell_offer",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_timing_changes_do_not_move_armed_actions() {
    let h = harness();
    let received_at = h.clock.now();

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap();
    let armed = outcome.armed[0].clone();
    assert_eq!(armed.due_at - received_at, TimeDelta::minutes(1));

    let mut slower = tenant();
    slower.timings.cart_reminder1_minutes = 30;
    h.tenants.insert(slower).await;

    let stored = h.store.get_action(&armed.id).unwrap().unwrap();
    assert_eq!(stored.due_at, armed.due_at);

    tokio::time::sleep(Duration::from_secs(61)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.template, TemplateKind::CartReminder1);
    assert!(pending_kinds(&h.store).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_cart_started_supersedes_first() {
    let h = harness();

    let first = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;

    let mut event = cart_event("Garden Villa");
    event.cart_items = Some(vec![LineItem::new(99, "Garden Villa", 150.0)]);
    let second = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, event)
        .await
        .unwrap();

    assert_ne!(first.armed[0].id, second.armed[0].id);
    assert_eq!(h.store.pending_actions().unwrap().len(), 1);
    assert!(h.store.get_action(&first.armed[0].id).unwrap().is_none());

    // First due time passes without a send
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(h.recorder.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(30)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.parameters[0], TemplateParam::text("Garden Villa"));
}

#[tokio::test(start_paused = true)]
async fn test_restore_fires_overdue_and_rearms_future_actions() {
    let store = Arc::new(Store::in_memory().unwrap());
    let h = harness_with(store.clone(), false);
    let now = h.clock.now();

    let overdue = ScheduledAction::new(
        "sunset",
        "+15550001111",
        ActionKind::CartReminder2,
        now - TimeDelta::minutes(10),
        ActionPayload::default(),
    );
    let future = ScheduledAction::new(
        "sunset",
        "+15550002222",
        ActionKind::CartReminder2,
        now + TimeDelta::hours(1),
        ActionPayload::default(),
    );
    store.upsert_action(&overdue).unwrap();
    store.upsert_action(&future).unwrap();

    assert_eq!(h.scheduler.restore().unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let sent = h.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent.to, "+15550001111");

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.recorder.sent().len(), 2);
    assert!(store.pending_actions().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_keeps_rows_for_restore() {
    let h = harness();

    h.scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap();
    h.scheduler.shutdown();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(h.recorder.sent().is_empty());
    assert_eq!(h.scheduler.pending().unwrap().len(), 1);

    h.scheduler.restore().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.recorder.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_scheduled_send_is_not_retried() {
    let h = harness_with(Arc::new(Store::in_memory().unwrap()), true);

    h.scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.recorder.sent().len(), 1);
    assert!(h.store.pending_actions().unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.recorder.sent().len(), 1);
    assert!(h.store.list_outbound("sunset").unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_immediate_send_still_arms() {
    let h = harness_with(Arc::new(Store::in_memory().unwrap()), true);

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartAbandoned, cart_event("Ocean View"))
        .await
        .unwrap();

    assert!(outcome.sent.is_none());
    assert!(outcome.send_error.is_some());
    assert_eq!(pending_kinds(&h.store), vec![ActionKind::CartReminder2]);
}

#[tokio::test(start_paused = true)]
async fn test_arming_disabled_only_sends_immediately() {
    let mut h = harness();
    h.scheduler = h.scheduler.clone().with_arming(false);

    let outcome = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartAbandoned, cart_event("Ocean View"))
        .await
        .unwrap();

    assert!(outcome.sent.is_some());
    assert!(outcome.armed.is_empty());
    assert!(h.store.pending_actions().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_events_are_rejected_before_arming() {
    let h = harness();

    let missing_phone = LifecycleEvent {
        cart_items: Some(vec![]),
        ..Default::default()
    };
    let err = h
        .scheduler
        .handle("sunset", LifecycleEventKind::CartStarted, missing_phone)
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    let err = h
        .scheduler
        .handle("sunset", LifecycleEventKind::OrderDelivered, cart_event("Ocean View"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    let err = h
        .scheduler
        .handle("nowhere", LifecycleEventKind::CartStarted, cart_event("Ocean View"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::TenantNotFound(id) if id == "nowhere"));

    assert!(h.store.pending_actions().unwrap().is_empty());
    assert!(h.recorder.sent().is_empty());
}
