//! `reqwest`-backed GitHub REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::types::{AnalysisSubmission, Issue, NewIssue};
use super::{ApiError, PlatformApi};

const API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("zeroday-radar/", env!("CARGO_PKG_VERSION"));

/// GitHub REST API client shared by all requests.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
}

impl GithubClient {
    /// Build a client for `base_url`, authenticating with `token` if given.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: Url, token: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// `{base}/repos/{owner}/{repo}/{rest...}` with each segment escaped.
    fn repo_url(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| ApiError::InvalidPath {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })?;
            segments.pop_if_empty().push("repos").push(owner).push(repo).extend(rest);
        }
        Ok(url)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        debug!(operation = operation, status_code = status.as_u16(), "github_api_response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            operation = operation,
            status_code = status.as_u16(),
            body_length = body.len(),
            "github_api_error_status"
        );

        Err(ApiError::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout { operation }
            } else {
                ApiError::Decode { operation, source: e }
            }
        })
    }
}

fn transport_error(operation: &'static str, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout { operation }
    } else {
        ApiError::Transport { operation, source: e }
    }
}

#[async_trait]
impl PlatformApi for GithubClient {
    async fn query_code_scanning_analyses(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        const OPERATION: &str = "query_code_scanning_analyses";

        let url = self.repo_url(owner, repo, &["code-scanning", "analyses"])?;
        let response = self.send(OPERATION, self.http.get(url)).await?;
        Self::decode(OPERATION, response).await
    }

    async fn submit_code_scanning_analysis(
        &self,
        owner: &str,
        repo: &str,
        submission: &AnalysisSubmission,
    ) -> Result<(), ApiError> {
        const OPERATION: &str = "submit_code_scanning_analysis";

        let url = self.repo_url(owner, repo, &["code-scanning", "analyses"])?;
        self.send(OPERATION, self.http.post(url).json(submission))
            .await?;
        Ok(())
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> Result<Issue, ApiError> {
        const OPERATION: &str = "create_issue";

        let url = self.repo_url(owner, repo, &["issues"])?;
        let response = self.send(OPERATION, self.http.post(url).json(issue)).await?;
        Self::decode(OPERATION, response).await
    }
}
