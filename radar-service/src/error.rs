//! Error types for webhook handling.

use axum::http::StatusCode;
use thiserror::Error;

use crate::github::ApiError;

/// Reasons a delivery could not be handled.
///
/// Every variant surfaces to the caller as the same generic failure
/// response; the detail only reaches the log.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature did not verify")]
    SignatureInvalid,

    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    #[error("payload for {event} event is malformed: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("downstream API call failed: {0}")]
    Downstream(#[from] ApiError),
}

impl WebhookError {
    /// HTTP status reported for this error.
    ///
    /// Signature failures are indistinguishable from other failures unless
    /// `reject_with_401` is set.
    pub fn status_code(&self, reject_with_401: bool) -> StatusCode {
        match self {
            WebhookError::SignatureInvalid if reject_with_401 => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::SignatureInvalid => "signature_invalid",
            WebhookError::MissingHeader(_) => "missing_header",
            WebhookError::InvalidPayload { .. } => "invalid_payload",
            WebhookError::Downstream(_) => "downstream_api_error",
        }
    }
}
