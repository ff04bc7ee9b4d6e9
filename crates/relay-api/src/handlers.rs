//! HTTP handlers
//!
//! Event and query endpoints return JSON errors through `ApiError`.
//! Provider webhooks always acknowledge with 200 and only log failures,
//! since providers retry anything else.

use axum::{
    Form, Json,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use relay_core::{BookingLead, LeadStatus, Product, TenantConfig};
use relay_inbound::InboundProvider;
use relay_schedule::{LifecycleEvent, LifecycleEventKind};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, Result};
use crate::server::AppState;

/// Empty TwiML reply; Twilio expects XML from webhooks
pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// Optional explicit routing for provider webhooks
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    pub tenant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    pub status: Option<String>,
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// `POST /tenants/{tenant_id}/events/{event}`
pub async fn lifecycle_event(
    State(state): State<AppState>,
    Path((tenant_id, event)): Path<(String, String)>,
    body: std::result::Result<Json<LifecycleEvent>, JsonRejection>,
) -> Result<Response> {
    let kind: LifecycleEventKind = event.parse()?;
    let Json(body) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let outcome = state.scheduler.handle(&tenant_id, kind, body).await?;

    let status = if outcome.send_error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome)).into_response())
}

/// `GET /tenants/{tenant_id}/leads?status=`
pub async fn list_leads(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<Vec<BookingLead>>> {
    require_tenant(&state, &tenant_id).await?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<LeadStatus>())
        .transpose()
        .map_err(ApiError::InvalidRequest)?;

    Ok(Json(state.store.list_leads(&tenant_id, status)?))
}

/// `GET /tenants/{tenant_id}/products`
pub async fn list_products(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let tenant = require_tenant(&state, &tenant_id).await?;
    Ok(Json(state.catalog.resolve(&tenant).await))
}

/// `POST /myoperator/webhook/message`
pub async fn myoperator_message(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Json<Value> {
    let raw = match body {
        Ok(Json(raw)) => raw,
        Err(e) => {
            warn!(provider = "myoperator", "Unreadable webhook body: {}", e);
            return Json(json!({ "success": false, "error": e.body_text() }));
        }
    };

    let provider = InboundProvider::MyOperator;
    let Some(tenant) = route_message(&state, provider, &query, &raw).await else {
        return Json(json!({ "success": true, "message": "Webhook received but no tenant found" }));
    };

    match state.classifier.classify(&tenant.id, provider, raw) {
        Ok(Some(classified)) => Json(json!({
            "success": true,
            "messageId": classified.message.message_id,
            "leadId": classified.lead.map(|l| l.id),
        })),
        Ok(None) => Json(json!({ "success": true, "message": "Not an incoming message" })),
        Err(e) => {
            error!(tenant = %tenant.id, provider = %provider, "Failed to process webhook: {}", e);
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

/// `POST /myoperator/webhook/status`
pub async fn myoperator_status(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Json<Value> {
    let raw = match body {
        Ok(Json(raw)) => raw,
        Err(e) => {
            warn!(provider = "myoperator", "Unreadable status body: {}", e);
            return Json(json!({ "success": false, "error": e.body_text() }));
        }
    };

    match apply_status(&state, InboundProvider::MyOperator, &raw) {
        Ok(true) => Json(json!({ "success": true })),
        Ok(false) => Json(json!({ "success": true, "message": "Message not found in any tenant" })),
        Err(e) => Json(json!({ "success": false, "error": e })),
    }
}

/// `POST /twilio/webhook/message`
pub async fn twilio_message(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> impl IntoResponse {
    let provider = InboundProvider::Twilio;

    match form {
        Ok(Form(fields)) => {
            let raw = form_to_json(fields);
            if let Some(tenant) = route_message(&state, provider, &query, &raw).await {
                if let Err(e) = state.classifier.classify(&tenant.id, provider, raw) {
                    error!(tenant = %tenant.id, provider = %provider, "Failed to process webhook: {}", e);
                }
            }
        }
        Err(e) => warn!(provider = %provider, "Unreadable webhook form: {}", e),
    }

    twiml()
}

/// `POST /twilio/webhook/status`
pub async fn twilio_status(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> impl IntoResponse {
    match form {
        Ok(Form(fields)) => {
            let _ = apply_status(&state, InboundProvider::Twilio, &form_to_json(fields));
        }
        Err(e) => warn!(provider = "twilio", "Unreadable status form: {}", e),
    }

    twiml()
}

fn twiml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML)
}

fn form_to_json(fields: HashMap<String, String>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

async fn require_tenant(state: &AppState, tenant_id: &str) -> Result<TenantConfig> {
    state
        .tenants
        .get(tenant_id)
        .await?
        .ok_or_else(|| ApiError::TenantNotFound(tenant_id.to_string()))
}

/// Tenant for a message webhook: `?tenant_id=` when given, otherwise the
/// business number the provider reports
async fn route_message(
    state: &AppState,
    provider: InboundProvider,
    query: &WebhookQuery,
    raw: &Value,
) -> Option<TenantConfig> {
    let lookup = match (&query.tenant_id, provider.business_identifier(raw)) {
        (Some(tenant_id), _) => state.tenants.get(tenant_id).await,
        (None, Some(id)) => match provider {
            InboundProvider::MyOperator => state.tenants.find_by_phone_number_id(id).await,
            InboundProvider::Twilio => state.tenants.find_by_business_phone(id).await,
        },
        (None, None) => {
            warn!(provider = %provider, "Webhook without a business identifier");
            return None;
        }
    };

    match lookup {
        Ok(Some(tenant)) => Some(tenant),
        Ok(None) => {
            warn!(
                provider = %provider,
                business_id = provider.business_identifier(raw).unwrap_or_default(),
                "No tenant found for webhook"
            );
            None
        }
        Err(e) => {
            error!(provider = %provider, "Tenant lookup failed: {}", e);
            None
        }
    }
}

/// Route a status webhook by message id and apply it. `Ok(false)` when no
/// tenant owns the message.
fn apply_status(state: &AppState, provider: InboundProvider, raw: &Value) -> std::result::Result<bool, String> {
    let Some(message_id) = provider.status_message_id(raw) else {
        debug!(provider = %provider, "Status webhook without message id");
        return Ok(false);
    };

    let tenant_id = match state.store.find_message_tenant(message_id) {
        Ok(Some(tenant_id)) => tenant_id,
        Ok(None) => {
            info!(provider = %provider, message_id, "Status for unknown message");
            return Ok(false);
        }
        Err(e) => {
            error!(provider = %provider, message_id, "Message lookup failed: {}", e);
            return Err(e.to_string());
        }
    };

    state
        .classifier
        .apply_status(&tenant_id, provider, raw)
        .map_err(|e| {
            error!(tenant = %tenant_id, provider = %provider, "Failed to apply status: {}", e);
            e.to_string()
        })
}
