use std::sync::Arc;

use relay_core::{ContentType, LeadStatus, Store};
use relay_inbound::{Classifier, InboundError, InboundProvider};
use serde_json::{Value, json};

fn classifier() -> (Classifier, Arc<Store>) {
    let store = Arc::new(Store::in_memory().unwrap());
    (Classifier::new(store.clone()), store)
}

fn myoperator_text(id: &str, body: &str) -> Value {
    json!({
        "type": "message",
        "source": "lc",
        "event": "received",
        "timestamp": "2024-11-04T04:27:28.857052Z",
        "data": {
            "id": id,
            "action": "incoming",
            "status": "received",
            "data": {"type": "text", "context": {"body": body}},
            "conversation": {
                "customer_country_code": "91",
                "customer_contact": "7900766070",
                "customer_name": "Priya"
            },
            "phone_number_id": "411835805357155"
        }
    })
}

fn twilio_form(sid: &str, body: &str) -> Value {
    json!({
        "MessageSid": sid,
        "From": "whatsapp:+15550001111",
        "To": "whatsapp:+14155238886",
        "Body": body,
        "NumMedia": "0",
        "ProfileName": "Sam"
    })
}

#[test]
fn test_myoperator_text_is_stored_canonically() {
    let (classifier, store) = classifier();

    let classified = classifier
        .classify("sunset", InboundProvider::MyOperator, myoperator_text("wamid.1", "Hello there"))
        .unwrap()
        .unwrap();

    assert!(classified.lead.is_none());
    let message = store.get_inbound("sunset", "wamid.1").unwrap().unwrap();
    assert_eq!(message.sender_phone, "917900766070");
    assert_eq!(message.sender_name, "Priya");
    assert_eq!(message.body, "Hello there");
    assert_eq!(message.content_type, ContentType::Text);
    assert_eq!(message.provider, "myoperator");
    assert_eq!(message.status, "received");
    assert!(!message.read);
    assert_eq!(message.raw["data"]["phone_number_id"], "411835805357155");
}

#[test]
fn test_myoperator_outgoing_events_are_skipped() {
    let (classifier, store) = classifier();
    let mut raw = myoperator_text("wamid.out", "Is a room available?");
    raw["data"]["action"] = json!("outgoing");

    let result = classifier
        .classify("sunset", InboundProvider::MyOperator, raw)
        .unwrap();

    assert!(result.is_none());
    assert!(store.get_inbound("sunset", "wamid.out").unwrap().is_none());
    assert!(store.list_leads("sunset", None).unwrap().is_empty());
}

#[test]
fn test_myoperator_image_uses_caption_or_default() {
    let (classifier, _store) = classifier();
    let mut raw = myoperator_text("wamid.img", "");
    raw["data"]["data"] = json!({
        "type": "image",
        "context": {"link": "https://cdn.example.com/pool.jpg"}
    });

    let classified = classifier
        .classify("sunset", InboundProvider::MyOperator, raw)
        .unwrap()
        .unwrap();

    assert_eq!(classified.message.content_type, ContentType::Image);
    assert_eq!(classified.message.body, "Image received");
    assert_eq!(
        classified.message.media.as_deref(),
        Some("https://cdn.example.com/pool.jpg")
    );
}

#[test]
fn test_first_keyword_message_opens_exactly_one_lead() {
    let (classifier, store) = classifier();

    let first = classifier
        .classify("sunset", InboundProvider::MyOperator, myoperator_text("m1", "I want to BOOK a room"))
        .unwrap()
        .unwrap();
    let lead = first.lead.unwrap();
    assert!(lead.id.starts_with("lead_"));
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.source, "whatsapp");
    assert_eq!(lead.message_id, "m1");

    let second = classifier
        .classify("sunset", InboundProvider::MyOperator, myoperator_text("m2", "What is the price?"))
        .unwrap()
        .unwrap();
    assert!(second.lead.is_none());

    let leads = store.list_leads("sunset", Some(LeadStatus::New)).unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].customer_phone, "917900766070");

    // Once handled, a new keyword message opens a fresh lead
    assert!(store.update_lead_status(&lead.id, LeadStatus::Contacted).unwrap());
    let third = classifier
        .classify("sunset", InboundProvider::MyOperator, myoperator_text("m3", "Another stay please"))
        .unwrap()
        .unwrap();
    assert!(third.lead.is_some());
    assert_eq!(store.list_leads("sunset", None).unwrap().len(), 2);
}

#[test]
fn test_redelivered_webhook_does_not_duplicate() {
    let (classifier, store) = classifier();

    for _ in 0..2 {
        classifier
            .classify("sunset", InboundProvider::Twilio, twilio_form("SM1", "rooms for rent?"))
            .unwrap();
    }

    assert_eq!(store.list_leads("sunset", None).unwrap().len(), 1);
    assert!(store.get_inbound("sunset", "SM1").unwrap().is_some());
}

#[test]
fn test_twilio_rent_keyword_and_media() {
    let (classifier, _store) = classifier();

    let classified = classifier
        .classify("sunset", InboundProvider::Twilio, twilio_form("SM2", "Monthly rent?"))
        .unwrap()
        .unwrap();
    assert_eq!(classified.message.sender_phone, "+15550001111");
    assert_eq!(classified.message.sender_name, "Sam");
    assert_eq!(classified.lead.unwrap().provider, "twilio");

    let mut raw = twilio_form("SM3", "");
    raw["NumMedia"] = json!("1");
    raw["MediaUrl0"] = json!("https://api.twilio.com/media/ME1");
    raw["MediaContentType0"] = json!("video/mp4");
    let classified = classifier
        .classify("sunset", InboundProvider::Twilio, raw)
        .unwrap()
        .unwrap();
    assert_eq!(classified.message.content_type, ContentType::Video);
    assert_eq!(classified.message.media.as_deref(), Some("https://api.twilio.com/media/ME1"));
}

#[test]
fn test_status_updates_mark_read_and_errors() {
    let (classifier, store) = classifier();
    classifier
        .classify("sunset", InboundProvider::MyOperator, myoperator_text("m1", "hi"))
        .unwrap();
    classifier
        .classify("sunset", InboundProvider::Twilio, twilio_form("SM9", "hi"))
        .unwrap();

    let applied = classifier
        .apply_status(
            "sunset",
            InboundProvider::MyOperator,
            &json!({"message_id": "m1", "status": "read", "timestamp": "1717200000"}),
        )
        .unwrap();
    assert!(applied);
    let message = store.get_inbound("sunset", "m1").unwrap().unwrap();
    assert!(message.read);
    assert_eq!(message.status, "read");

    classifier
        .apply_status(
            "sunset",
            InboundProvider::Twilio,
            &json!({
                "MessageSid": "SM9",
                "MessageStatus": "failed",
                "ErrorCode": "30008",
                "ErrorMessage": "Unknown destination"
            }),
        )
        .unwrap();
    let message = store.get_inbound("sunset", "SM9").unwrap().unwrap();
    assert_eq!(message.status, "failed");
    assert_eq!(message.error_code.as_deref(), Some("30008"));
    assert_eq!(message.error_message.as_deref(), Some("Unknown destination"));
    assert!(!message.read);
}

#[test]
fn test_status_for_unknown_message_is_a_no_op() {
    let (classifier, _store) = classifier();

    let applied = classifier
        .apply_status(
            "sunset",
            InboundProvider::Twilio,
            &json!({"MessageSid": "SM404", "MessageStatus": "delivered"}),
        )
        .unwrap();
    assert!(!applied);

    let err = classifier
        .apply_status("sunset", InboundProvider::MyOperator, &json!({"status": "read"}))
        .unwrap_err();
    assert!(matches!(err, InboundError::MissingField("message_id")));
}
