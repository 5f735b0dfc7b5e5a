//! Event dispatch and action handlers.
//!
//! Each verified event runs at most one handler. Handlers call the platform
//! API and log failures with the operation and repository before passing the
//! error back up.
//!
//! ```text
//! repository                      → query code-scanning analyses
//! push                            → submit code-scanning analysis
//! repository_vulnerability_alert  → open an issue (critical only)
//! anything else                   → ignored
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::error::WebhookError;
use crate::events::{PushEvent, RepositoryEvent, Severity, VulnerabilityAlertEvent, WebhookEvent};
use crate::github::{AnalysisSubmission, NewIssue, PlatformApi};

/// Tool name attached to submitted analyses.
pub const TOOL_NAME: &str = "ZeroDayRadar";

/// Ref every push scan is submitted against unless `scan_pushed_ref` is set.
///
/// GitHub sends pushes for every branch, so by default scans of feature
/// branches are filed under main.
pub const DEFAULT_SCAN_REF: &str = "refs/heads/main";

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran and its API call succeeded.
    Handled,
    /// The event was recognized but needed no action.
    Skipped,
    /// No handler exists for the event.
    Ignored,
}

/// Routes verified events to their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn PlatformApi>,
    scan_pushed_ref: bool,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            scan_pushed_ref: false,
        }
    }

    /// Submit push scans against the pushed ref instead of [`DEFAULT_SCAN_REF`].
    pub fn with_scan_pushed_ref(mut self, enabled: bool) -> Self {
        self.scan_pushed_ref = enabled;
        self
    }

    /// Run the handler for `event`.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<Outcome, WebhookError> {
        match event {
            WebhookEvent::Repository(payload) => self.handle_repository(payload).await,
            WebhookEvent::Push(payload) => self.handle_push(payload).await,
            WebhookEvent::VulnerabilityAlert(payload) => {
                self.handle_vulnerability_alert(payload).await
            }
            WebhookEvent::Unrecognized(name) => {
                info!(event = %name, "webhook_event_ignored");
                Ok(Outcome::Ignored)
            }
        }
    }

    async fn handle_repository(&self, payload: &RepositoryEvent) -> Result<Outcome, WebhookError> {
        let repo = &payload.repository;
        info!(
            action = %payload.action,
            repository = %repo.full_name,
            "repository_event_received"
        );

        let analyses = self
            .api
            .query_code_scanning_analyses(&repo.owner_login, &repo.name)
            .await
            .map_err(|e| {
                error!(
                    operation = "query_code_scanning_analyses",
                    repository = %repo.full_name,
                    error = %e,
                    "repository_analysis_failed"
                );
                e
            })?;

        info!(
            repository = %repo.full_name,
            analysis_count = analyses.len(),
            "repository_analysis_complete"
        );

        Ok(Outcome::Handled)
    }

    async fn handle_push(&self, payload: &PushEvent) -> Result<Outcome, WebhookError> {
        let repo = &payload.repository;
        info!(
            repository = %repo.full_name,
            branch = %payload.branch(),
            commit_sha = %payload.after,
            "push_event_received"
        );

        let git_ref = if self.scan_pushed_ref {
            payload.git_ref.clone()
        } else {
            DEFAULT_SCAN_REF.to_string()
        };

        let submission = AnalysisSubmission {
            commit_sha: payload.after.clone(),
            git_ref,
            tool_name: TOOL_NAME.to_string(),
            results: Vec::new(),
        };

        self.api
            .submit_code_scanning_analysis(&repo.owner_login, &repo.name, &submission)
            .await
            .map_err(|e| {
                error!(
                    operation = "submit_code_scanning_analysis",
                    repository = %repo.full_name,
                    commit_sha = %payload.after,
                    error = %e,
                    "push_scan_failed"
                );
                e
            })?;

        info!(
            repository = %repo.full_name,
            commit_sha = %submission.commit_sha,
            scan_ref = %submission.git_ref,
            "push_scan_submitted"
        );

        Ok(Outcome::Handled)
    }

    async fn handle_vulnerability_alert(
        &self,
        payload: &VulnerabilityAlertEvent,
    ) -> Result<Outcome, WebhookError> {
        let repo = &payload.repository;
        let alert = &payload.alert;
        info!(
            repository = %repo.full_name,
            severity = %alert.severity,
            summary = %alert.summary,
            "vulnerability_alert_received"
        );

        if alert.severity != Severity::Critical {
            return Ok(Outcome::Skipped);
        }

        let issue = security_issue(payload);
        let created = self
            .api
            .create_issue(&repo.owner_login, &repo.name, &issue)
            .await
            .map_err(|e| {
                error!(
                    operation = "create_issue",
                    repository = %repo.full_name,
                    error = %e,
                    "security_issue_failed"
                );
                e
            })?;

        info!(
            repository = %repo.full_name,
            issue_number = created.number,
            issue_url = %created.html_url,
            "security_issue_created"
        );

        Ok(Outcome::Handled)
    }
}

/// Build the issue filed for a vulnerability alert.
pub fn security_issue(payload: &VulnerabilityAlertEvent) -> NewIssue {
    let alert = &payload.alert;
    let severity = alert.severity.as_str();

    let body = format!(
        "## Security Vulnerability Detected\n\
         \n\
         **Severity:** {severity}\n\
         **Package:** {package}\n\
         **Current Version:** {range}\n\
         **Patched Version:** {fixed}\n\
         \n\
         ### Description\n\
         {description}\n\
         \n\
         ### Impact\n\
         {details}\n\
         \n\
         ### Remediation\n\
         Please update to version {fixed} or later to resolve this vulnerability.\n",
        severity = severity,
        package = alert.affected_package_name,
        range = alert.affected_range,
        fixed = alert.fixed_in,
        description = alert.description,
        details = alert.details,
    );

    NewIssue {
        title: format!("Security Alert: {}", alert.summary),
        body,
        labels: vec![
            "security".to_string(),
            "vulnerability".to_string(),
            severity.to_string(),
        ],
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, RecordingApi};
    use super::*;
    use crate::events::{RepositoryRef, VulnerabilityAlert};

    fn repository() -> RepositoryRef {
        RepositoryRef {
            owner_login: "test".to_string(),
            name: "repo".to_string(),
            full_name: "test/repo".to_string(),
        }
    }

    fn alert_event(severity: Severity) -> VulnerabilityAlertEvent {
        VulnerabilityAlertEvent {
            action: "create".to_string(),
            alert: VulnerabilityAlert {
                severity,
                summary: "Critical vulnerability".to_string(),
                description: "Description of vulnerability".to_string(),
                details: "Impact details".to_string(),
                affected_package_name: "package-name".to_string(),
                affected_range: "<1.0.0".to_string(),
                fixed_in: "1.0.0".to_string(),
            },
            repository: repository(),
        }
    }

    fn push_event(git_ref: &str) -> WebhookEvent {
        WebhookEvent::Push(PushEvent {
            git_ref: git_ref.to_string(),
            after: "commitsha123".to_string(),
            repository: repository(),
        })
    }

    #[tokio::test]
    async fn test_repository_queries_analyses() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone());

        let event = WebhookEvent::Repository(RepositoryEvent {
            action: "created".to_string(),
            repository: repository(),
        });

        assert_eq!(dispatcher.dispatch(&event).await.unwrap(), Outcome::Handled);
        assert_eq!(
            api.calls(),
            vec![Call::QueryAnalyses {
                owner: "test".to_string(),
                repo: "repo".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_push_submits_against_main_by_default() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone());

        dispatcher.dispatch(&push_event("refs/heads/feature")).await.unwrap();

        match api.calls().as_slice() {
            [Call::SubmitAnalysis { owner, repo, submission }] => {
                assert_eq!(owner, "test");
                assert_eq!(repo, "repo");
                assert_eq!(submission.commit_sha, "commitsha123");
                assert_eq!(submission.git_ref, DEFAULT_SCAN_REF);
                assert_eq!(submission.tool_name, TOOL_NAME);
                assert!(submission.results.is_empty());
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_can_scan_pushed_ref() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone()).with_scan_pushed_ref(true);

        dispatcher.dispatch(&push_event("refs/heads/feature")).await.unwrap();

        match api.calls().as_slice() {
            [Call::SubmitAnalysis { submission, .. }] => {
                assert_eq!(submission.git_ref, "refs/heads/feature");
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_critical_alert_creates_issue() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone());

        let event = WebhookEvent::VulnerabilityAlert(alert_event(Severity::Critical));
        assert_eq!(dispatcher.dispatch(&event).await.unwrap(), Outcome::Handled);

        match api.calls().as_slice() {
            [Call::CreateIssue { owner, repo, issue }] => {
                assert_eq!(owner, "test");
                assert_eq!(repo, "repo");
                assert_eq!(issue.title, "Security Alert: Critical vulnerability");
                assert_eq!(issue.labels, vec!["security", "vulnerability", "critical"]);
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_critical_alerts_are_only_logged() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone());

        for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::Unknown] {
            let event = WebhookEvent::VulnerabilityAlert(alert_event(severity));
            assert_eq!(dispatcher.dispatch(&event).await.unwrap(), Outcome::Skipped);
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_event_is_ignored() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = Dispatcher::new(api.clone());

        let event = WebhookEvent::Unrecognized("star".to_string());
        assert_eq!(dispatcher.dispatch(&event).await.unwrap(), Outcome::Ignored);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_is_propagated() {
        let api = Arc::new(RecordingApi::failing());
        let dispatcher = Dispatcher::new(api.clone());

        let result = dispatcher.dispatch(&push_event("refs/heads/main")).await;
        assert!(matches!(result, Err(WebhookError::Downstream(_))));
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_security_issue_body() {
        let issue = security_issue(&alert_event(Severity::Critical));

        assert!(issue.body.starts_with("## Security Vulnerability Detected\n\n"));
        assert!(issue.body.contains("**Severity:** critical\n"));
        assert!(issue.body.contains("**Package:** package-name\n"));
        assert!(issue.body.contains("**Current Version:** <1.0.0\n"));
        assert!(issue.body.contains("**Patched Version:** 1.0.0\n"));
        assert!(issue.body.contains("### Description\nDescription of vulnerability\n"));
        assert!(issue.body.contains("### Impact\nImpact details\n"));
        assert!(issue
            .body
            .contains("Please update to version 1.0.0 or later to resolve this vulnerability."));
    }
}
