//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{
    health, lifecycle_event, list_leads, list_products, myoperator_message, myoperator_status,
    twilio_message, twilio_status,
};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Lifecycle events from tenant websites
        .route("/tenants/{tenant_id}/events/{event}", post(lifecycle_event))
        .route("/tenants/{tenant_id}/leads", get(list_leads))
        .route("/tenants/{tenant_id}/products", get(list_products))
        // Provider webhooks
        .route("/myoperator/webhook/message", post(myoperator_message))
        .route("/myoperator/webhook/status", post(myoperator_status))
        .route("/twilio/webhook/message", post(twilio_message))
        .route("/twilio/webhook/status", post(twilio_status))
}
