//! ZeroDayRadar - GitHub webhook receiver for security automation.
//!
//! Verifies GitHub webhook signatures and reacts to repository, push and
//! vulnerability-alert events through the GitHub REST API.
//!
//! ## Architecture
//!
//! ```text
//! GitHub → POST /webhook → signature check → WebhookEvent → Dispatcher → GitHub API
//! ```

pub mod config;
pub mod dedupe;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod github;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, WebhookSecret};
pub use dedupe::DeliveryLog;
pub use dispatch::{Dispatcher, Outcome};
pub use error::WebhookError;
pub use events::{RepositoryRef, Severity, VulnerabilityAlert, WebhookEvent};
pub use github::{ApiError, GithubClient, PlatformApi};
pub use web::{router, AppState};
