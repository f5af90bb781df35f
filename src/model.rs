use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Conclusion of a finished workflow run or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    #[serde(other)]
    Other,
}

/// One execution of the deployment workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub head_sha: String,
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub run_number: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn succeeded(&self) -> bool {
        self.conclusion == Some(Conclusion::Success)
    }

    /// Creation time for log lines, e.g. `2024-05-01 10:00 UTC`.
    pub fn created_label(&self) -> String {
        self.created_at.map_or_else(
            || "unknown time".to_string(),
            |created_at| created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
    }
}

/// Result of a named job within a workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct JobOutcome {
    pub name: String,
    pub conclusion: Option<Conclusion>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.conclusion == Some(Conclusion::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Identical,
    Ahead,
    Behind,
    Diverged,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    pub sha: String,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }
}

/// Comparison of the deployed commit (base) against a candidate head.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitComparison {
    pub status: ComparisonStatus,
    pub ahead_by: u32,
    pub behind_by: u32,
    #[serde(default)]
    pub commits: Vec<Commit>,
    pub base_commit: Commit,
    pub merge_base_commit: Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    #[serde(rename = "html_url")]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub number: u64,
    pub state: PullRequestState,
    pub merged_at: Option<String>,
}

impl PullRequest {
    /// Closed with a merge timestamp; closed-unmerged and open pull requests don't count.
    pub fn is_merged(&self) -> bool {
        self.state == PullRequestState::Closed
            && self.merged_at.as_deref().is_some_and(|merged_at| !merged_at.is_empty())
    }
}

/// A tracked issue linked to a pull request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueAttachment {
    pub issue_id: String,
    pub issue_identifier: String,
    /// Ids of existing comments whose body equals the rendered notification.
    pub matching_comment_ids: Vec<String>,
}

impl IssueAttachment {
    pub fn already_notified(&self) -> bool {
        !self.matching_comment_ids.is_empty()
    }
}

/// Commits introduced since the closest previous deploy, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub commits: Vec<Commit>,
    pub last_deploy_sha: String,
    pub last_deploy_behind_by: u32,
    /// The previous deploy's commit was not found in the fetched window.
    pub truncated: bool,
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_request(state: PullRequestState, merged_at: Option<&str>) -> PullRequest {
        PullRequest {
            url: "https://github.com/acme/app/pull/1".to_string(),
            title: "Fix bug".to_string(),
            number: 1,
            state,
            merged_at: merged_at.map(ToString::to_string),
        }
    }

    #[test]
    fn test_merged_filter() {
        assert!(pull_request(PullRequestState::Closed, Some("2024-05-01T10:00:00Z")).is_merged());
        assert!(!pull_request(PullRequestState::Closed, Some("")).is_merged());
        assert!(!pull_request(PullRequestState::Closed, None).is_merged());
        assert!(!pull_request(PullRequestState::Open, Some("2024-05-01T10:00:00Z")).is_merged());
    }

    #[test]
    fn test_deserialize_github_shapes() {
        let run: WorkflowRun = serde_json::from_str(
            r#"{"id": 42, "head_sha": "abcdef1234", "conclusion": "timed_out", "run_number": 7,
                "created_at": "2024-05-01T10:00:00Z", "status": "completed"}"#,
        )
        .unwrap();
        assert_eq!(run.conclusion, Some(Conclusion::Other));
        assert!(!run.succeeded());
        assert_eq!(run.created_label(), "2024-05-01 10:00 UTC");

        let comparison: CommitComparison = serde_json::from_str(
            r#"{"status": "behind", "ahead_by": 0, "behind_by": 3, "commits": [],
                "base_commit": {"sha": "aaa"}, "merge_base_commit": {"sha": "bbb"}}"#,
        )
        .unwrap();
        assert_eq!(comparison.status, ComparisonStatus::Behind);
        assert_eq!(comparison.behind_by, 3);

        let pull_request: PullRequest = serde_json::from_str(
            r#"{"html_url": "https://x/1", "title": "Fix", "number": 1, "state": "closed",
                "merged_at": null}"#,
        )
        .unwrap();
        assert_eq!(pull_request.url, "https://x/1");
        assert!(!pull_request.is_merged());
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }
}
