//! Request and response bodies for the GitHub REST API.

use serde::{Deserialize, Serialize};

/// Body of a code-scanning analysis submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSubmission {
    pub commit_sha: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub tool_name: String,
    /// Scan results; the external scanner fills these in later
    pub results: Vec<serde_json::Value>,
}

/// Body of an issue creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// The parts of a created issue we log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_uses_ref_key() {
        let submission = AnalysisSubmission {
            commit_sha: "abc".to_string(),
            git_ref: "refs/heads/main".to_string(),
            tool_name: "ZeroDayRadar".to_string(),
            results: vec![],
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["ref"], "refs/heads/main");
        assert_eq!(json["results"], serde_json::json!([]));
        assert!(json.get("git_ref").is_none());
    }

    #[test]
    fn test_issue_tolerates_missing_fields() {
        let issue: Issue = serde_json::from_str(r#"{"number": 42}"#).unwrap();
        assert_eq!(issue.number, 42);
        assert!(issue.html_url.is_empty());
    }
}
