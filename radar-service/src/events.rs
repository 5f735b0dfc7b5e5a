//! Typed GitHub webhook events.
//!
//! The `X-GitHub-Event` header picks the variant and the verified raw body is
//! deserialized into that variant's payload. Only the fields the handlers
//! read are modelled; everything else in the payload is ignored.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::error::WebhookError;

/// Event name for repository lifecycle events.
pub const REPOSITORY_EVENT: &str = "repository";

/// Event name for pushes.
pub const PUSH_EVENT: &str = "push";

/// Event name for Dependabot vulnerability alerts.
pub const VULNERABILITY_ALERT_EVENT: &str = "repository_vulnerability_alert";

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Repository(RepositoryEvent),
    Push(PushEvent),
    VulnerabilityAlert(VulnerabilityAlertEvent),
    /// Any event this service does not act on. Carries the event name.
    Unrecognized(String),
}

impl WebhookEvent {
    /// Build the event for `event_name` from the raw request body.
    ///
    /// Unrecognized events are not parsed at all.
    pub fn parse(event_name: &str, raw_body: &[u8]) -> Result<Self, WebhookError> {
        let invalid = |source| WebhookError::InvalidPayload {
            event: event_name.to_string(),
            source,
        };

        let event = match event_name {
            REPOSITORY_EVENT => {
                WebhookEvent::Repository(serde_json::from_slice(raw_body).map_err(invalid)?)
            }
            PUSH_EVENT => WebhookEvent::Push(serde_json::from_slice(raw_body).map_err(invalid)?),
            VULNERABILITY_ALERT_EVENT => {
                WebhookEvent::VulnerabilityAlert(serde_json::from_slice(raw_body).map_err(invalid)?)
            }
            other => WebhookEvent::Unrecognized(other.to_string()),
        };

        Ok(event)
    }

    /// The event name this variant was built from.
    pub fn name(&self) -> &str {
        match self {
            WebhookEvent::Repository(_) => REPOSITORY_EVENT,
            WebhookEvent::Push(_) => PUSH_EVENT,
            WebhookEvent::VulnerabilityAlert(_) => VULNERABILITY_ALERT_EVENT,
            WebhookEvent::Unrecognized(name) => name,
        }
    }
}

/// Read a JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Repository
// =============================================================================

/// Identifies the repository an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRepository")]
pub struct RepositoryRef {
    /// Login of the owning user or organization
    pub owner_login: String,
    /// Repository name without the owner
    pub name: String,
    /// `owner/name`
    pub full_name: String,
}

#[derive(Deserialize)]
struct RawRepository {
    full_name: String,
    name: String,
    owner: RawOwner,
}

#[derive(Deserialize)]
struct RawOwner {
    login: String,
}

impl From<RawRepository> for RepositoryRef {
    fn from(raw: RawRepository) -> Self {
        Self {
            owner_login: raw.owner.login,
            name: raw.name,
            full_name: raw.full_name,
        }
    }
}

// =============================================================================
// Event payloads
// =============================================================================

/// Payload of a `repository` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryEvent {
    /// created, deleted, archived, ...
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    pub repository: RepositoryRef,
}

/// Payload of a `push` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushEvent {
    /// Full ref that was pushed, e.g. `refs/heads/feature`
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Commit SHA the ref points to after the push
    pub after: String,
    pub repository: RepositoryRef,
}

impl PushEvent {
    /// Branch name with the `refs/heads/` prefix removed.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref)
    }
}

/// Payload of a `repository_vulnerability_alert` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VulnerabilityAlertEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    pub alert: VulnerabilityAlert,
    pub repository: RepositoryRef,
}

// =============================================================================
// Vulnerability alert
// =============================================================================

/// Advisory severity as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[serde(alias = "moderate")]
    Medium,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency vulnerability, flattened from the alert and its advisory.
///
/// Missing or null text fields are read as empty strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawAlert")]
pub struct VulnerabilityAlert {
    pub severity: Severity,
    pub summary: String,
    pub description: String,
    pub details: String,
    pub affected_package_name: String,
    pub affected_range: String,
    pub fixed_in: String,
}

#[derive(Deserialize)]
struct RawAlert {
    #[serde(default, deserialize_with = "null_as_default")]
    security_advisory: RawAdvisory,
    affected_package_name: Option<String>,
    affected_range: Option<String>,
    fixed_in: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawAdvisory {
    #[serde(default, deserialize_with = "null_as_default")]
    severity: Severity,
    summary: Option<String>,
    description: Option<String>,
    details: Option<String>,
}

impl From<RawAlert> for VulnerabilityAlert {
    fn from(raw: RawAlert) -> Self {
        let advisory = raw.security_advisory;
        Self {
            severity: advisory.severity,
            summary: advisory.summary.unwrap_or_default(),
            description: advisory.description.unwrap_or_default(),
            details: advisory.details.unwrap_or_default(),
            affected_package_name: raw.affected_package_name.unwrap_or_default(),
            affected_range: raw.affected_range.unwrap_or_default(),
            fixed_in: raw.fixed_in.unwrap_or_default(),
        }
    }
}
