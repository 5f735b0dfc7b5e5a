//! Webhook endpoint handlers.
//!
//! `POST /webhook` runs the whole pipeline inline:
//! 1. Capture the raw body and delivery headers
//! 2. Verify the signature over the raw bytes
//! 3. Parse the event and run its handler
//!
//! Every failure answers with the same generic body; details only go to the log.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::dedupe::DeliveryLog;
use crate::dispatch::{Dispatcher, Outcome};
use crate::error::WebhookError;
use crate::events::WebhookEvent;
use crate::github::PlatformApi;
use crate::web::delivery::{Delivery, EVENT_HEADER};
use crate::web::signature::verify_signature;
use crate::Config;

/// Body returned by `GET /webhook`.
pub const STATUS_MESSAGE: &str = "Webhook endpoint is running";

/// Body returned when a delivery was handled.
pub const PROCESSED_MESSAGE: &str = "Webhook processed";

/// Body returned for any failure.
pub const FAILED_MESSAGE: &str = "Webhook processing failed";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub delivery_log: Option<Arc<DeliveryLog>>,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn PlatformApi>) -> Self {
        let dispatcher = Dispatcher::new(api).with_scan_pushed_ref(config.scan_pushed_ref);

        let delivery_log = config.dedup_enabled().then(|| {
            Arc::new(DeliveryLog::new(
                config.delivery_dedup_capacity,
                Duration::from_secs(config.delivery_dedup_ttl_secs),
            ))
        });

        Self {
            config: Arc::new(config),
            dispatcher,
            delivery_log,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// GitHub Webhook
// =============================================================================

/// Liveness response for `GET /webhook`.
pub async fn webhook_status() -> &'static str {
    STATUS_MESSAGE
}

/// GitHub webhook endpoint.
///
/// The body is taken as raw `Bytes` so the signature is checked against
/// exactly what GitHub signed. Bodies the extractor rejects (for example
/// over the size limit) keep the extractor's status but get the generic
/// failure text.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            error!(
                status_code = rejection.status().as_u16(),
                error = %rejection.body_text(),
                "webhook_body_rejected"
            );
            return (rejection.status(), FAILED_MESSAGE).into_response();
        }
    };

    let delivery = Delivery::from_parts(&headers, body);

    info!(
        delivery_id = %delivery.id_for_log(),
        event = delivery.event_name.as_deref().unwrap_or(""),
        body_length = delivery.raw_body.len(),
        has_signature = delivery.signature.is_some(),
        "webhook_received"
    );

    match process_delivery(&state, &delivery).await {
        Ok(()) => (StatusCode::OK, PROCESSED_MESSAGE).into_response(),
        Err(e) => {
            error!(
                delivery_id = %delivery.id_for_log(),
                event = delivery.event_name.as_deref().unwrap_or(""),
                error_kind = e.kind(),
                error = %e,
                "webhook_processing_failed"
            );
            let status = e.status_code(state.config.reject_invalid_signature_with_401);
            (status, FAILED_MESSAGE).into_response()
        }
    }
}

/// Verify and dispatch a single delivery.
async fn process_delivery(state: &AppState, delivery: &Delivery) -> Result<(), WebhookError> {
    if !verify_signature(
        state.config.webhook_secret.as_bytes(),
        &delivery.raw_body,
        delivery.signature.as_deref(),
    ) {
        return Err(WebhookError::SignatureInvalid);
    }

    let event_name = delivery
        .event_name
        .as_deref()
        .ok_or(WebhookError::MissingHeader(EVENT_HEADER))?;

    let claim = match (&state.delivery_log, &delivery.delivery_id) {
        (Some(log), Some(id)) => {
            if !log.try_claim(id) {
                info!(delivery_id = %id, event = event_name, "webhook_duplicate_skipped");
                return Ok(());
            }
            Some((log, id))
        }
        _ => None,
    };

    let result = dispatch_event(state, event_name, &delivery.raw_body).await;

    if let (Err(_), Some((log, id))) = (&result, claim) {
        // Failed deliveries stay eligible for GitHub's redelivery.
        log.release(id);
    }

    let (event, outcome) = result?;

    info!(
        delivery_id = %delivery.id_for_log(),
        event = event.name(),
        outcome = ?outcome,
        "webhook_processed"
    );

    Ok(())
}

async fn dispatch_event(
    state: &AppState,
    event_name: &str,
    raw_body: &[u8],
) -> Result<(WebhookEvent, Outcome), WebhookError> {
    let event = WebhookEvent::parse(event_name, raw_body)?;
    let outcome = state.dispatcher.dispatch(&event).await?;
    Ok((event, outcome))
}
