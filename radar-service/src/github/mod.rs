//! GitHub REST API access.
//!
//! Handlers depend only on the [`PlatformApi`] trait so the HTTP client can be
//! swapped for a test double. [`GithubClient`] is the production
//! implementation.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::GithubClient;
pub use types::{AnalysisSubmission, Issue, NewIssue};

/// Errors from calls to the platform API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} response could not be decoded: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot build API URL for {owner}/{repo}")]
    InvalidPath { owner: String, repo: String },
}

/// Operations the webhook handlers need from the hosting platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// List code-scanning analyses for a repository.
    async fn query_code_scanning_analyses(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError>;

    /// Submit a code-scanning analysis for a commit.
    async fn submit_code_scanning_analysis(
        &self,
        owner: &str,
        repo: &str,
        submission: &AnalysisSubmission,
    ) -> Result<(), ApiError>;

    /// Open an issue in a repository.
    async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue)
        -> Result<Issue, ApiError>;
}
