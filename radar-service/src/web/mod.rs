//! Web server module for handling inbound GitHub webhooks.
//!
//! Routes:
//! - `GET /webhook`: liveness text
//! - `POST /webhook`: verify, dispatch, respond
//! - `GET /health`: JSON health check

pub mod delivery;
pub mod handlers;
pub mod signature;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use delivery::Delivery;
pub use handlers::{
    health, receive_webhook, webhook_status, AppState, HealthResponse, FAILED_MESSAGE,
    PROCESSED_MESSAGE, STATUS_MESSAGE,
};
pub use signature::verify_signature;

/// Path GitHub delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, get(webhook_status).post(receive_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
