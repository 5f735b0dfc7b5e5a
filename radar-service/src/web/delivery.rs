//! One inbound webhook request.

use axum::body::Bytes;
use axum::http::HeaderMap;

/// Header carrying the event name.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the unique delivery id.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Header carrying the HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Metadata and raw body of a single webhook delivery.
///
/// `raw_body` is kept exactly as received; signature verification runs over
/// these bytes.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event_name: Option<String>,
    pub delivery_id: Option<String>,
    pub signature: Option<String>,
    pub raw_body: Bytes,
}

impl Delivery {
    pub fn from_parts(headers: &HeaderMap, raw_body: Bytes) -> Self {
        Self {
            event_name: header_value(headers, EVENT_HEADER),
            delivery_id: header_value(headers, DELIVERY_HEADER),
            signature: header_value(headers, SIGNATURE_HEADER),
            raw_body,
        }
    }

    /// Delivery id for logging.
    pub fn id_for_log(&self) -> &str {
        self.delivery_id.as_deref().unwrap_or("unknown")
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
