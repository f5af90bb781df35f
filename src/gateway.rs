//! Capability surface of the two external services the pipeline talks to.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{Commit, CommitComparison, IssueAttachment, JobOutcome, PullRequest, WorkflowRun};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Read-only queries against the code host.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Most recent runs of a workflow, newest first.
    async fn list_recent_runs(&self, workflow: &str, page_size: u8)
        -> GatewayResult<Vec<WorkflowRun>>;

    async fn list_jobs(&self, run_id: u64) -> GatewayResult<Vec<JobOutcome>>;

    async fn compare(&self, base_sha: &str, head_sha: &str) -> GatewayResult<CommitComparison>;

    /// Commits reachable from `starting_sha`, newest first, at most `max_count`.
    async fn list_commits(&self, starting_sha: &str, max_count: u32)
        -> GatewayResult<Vec<Commit>>;

    async fn list_pull_requests_for_commit(&self, sha: &str) -> GatewayResult<Vec<PullRequest>>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Issues with an attachment pointing at `url`, each with its comments whose
    /// body equals `comment_body`.
    async fn find_issues_by_attachment_url(
        &self,
        url: &str,
        comment_body: &str,
    ) -> GatewayResult<Vec<IssueAttachment>>;

    async fn create_comment(&self, issue_id: &str, body: &str) -> GatewayResult<()>;
}

#[cfg(test)]
pub mod fakes {
    //! In-memory gateways for exercising the pipeline stages.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::model::{ComparisonStatus, Conclusion, PullRequestState};

    fn not_found(what: &str) -> GatewayError {
        GatewayError::Api {
            status: 404,
            message: format!("{what} not found"),
        }
    }

    #[derive(Default)]
    pub struct FakeSourceControl {
        pub runs: Vec<WorkflowRun>,
        pub jobs: HashMap<u64, Vec<JobOutcome>>,
        /// Keyed by head sha.
        pub comparisons: HashMap<String, CommitComparison>,
        /// Linear history, newest first.
        pub history: Vec<Commit>,
        pub pull_requests: HashMap<String, Vec<PullRequest>>,
        pub failing_shas: Vec<String>,
        pub list_commits_calls: Mutex<Vec<(String, u32)>>,
        pub list_jobs_calls: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl SourceControl for FakeSourceControl {
        async fn list_recent_runs(
            &self,
            _workflow: &str,
            page_size: u8,
        ) -> GatewayResult<Vec<WorkflowRun>> {
            Ok(self.runs.iter().take(page_size.into()).cloned().collect())
        }

        async fn list_jobs(&self, run_id: u64) -> GatewayResult<Vec<JobOutcome>> {
            self.list_jobs_calls.lock().unwrap().push(run_id);
            Ok(self.jobs.get(&run_id).cloned().unwrap_or_default())
        }

        async fn compare(
            &self,
            _base_sha: &str,
            head_sha: &str,
        ) -> GatewayResult<CommitComparison> {
            if self.failing_shas.iter().any(|sha| sha == head_sha) {
                return Err(not_found(head_sha));
            }
            self.comparisons
                .get(head_sha)
                .cloned()
                .ok_or_else(|| not_found(head_sha))
        }

        async fn list_commits(
            &self,
            starting_sha: &str,
            max_count: u32,
        ) -> GatewayResult<Vec<Commit>> {
            self.list_commits_calls
                .lock()
                .unwrap()
                .push((starting_sha.to_string(), max_count));
            let start = self
                .history
                .iter()
                .position(|commit| commit.sha == starting_sha)
                .ok_or_else(|| not_found(starting_sha))?;
            Ok(self.history[start..]
                .iter()
                .take(max_count as usize)
                .cloned()
                .collect())
        }

        async fn list_pull_requests_for_commit(
            &self,
            sha: &str,
        ) -> GatewayResult<Vec<PullRequest>> {
            if self.failing_shas.iter().any(|failing| failing == sha) {
                return Err(not_found(sha));
            }
            Ok(self.pull_requests.get(sha).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    pub struct FakeIssueTracker {
        /// Pull request URL to linked issues (id, identifier).
        pub attachments: HashMap<String, Vec<(String, String)>>,
        /// Issue id to comment bodies.
        pub comments: Mutex<HashMap<String, Vec<String>>>,
        pub failing_issue_ids: Vec<String>,
        pub lookups: Mutex<Vec<String>>,
    }

    impl FakeIssueTracker {
        pub fn link(mut self, url: &str, issue_id: &str, identifier: &str) -> Self {
            self.attachments
                .entry(url.to_string())
                .or_default()
                .push((issue_id.to_string(), identifier.to_string()));
            self
        }

        pub fn comments_on(&self, issue_id: &str) -> Vec<String> {
            self.comments
                .lock()
                .unwrap()
                .get(issue_id)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl IssueTracker for FakeIssueTracker {
        async fn find_issues_by_attachment_url(
            &self,
            url: &str,
            comment_body: &str,
        ) -> GatewayResult<Vec<IssueAttachment>> {
            self.lookups.lock().unwrap().push(url.to_string());
            let comments = self.comments.lock().unwrap();
            Ok(self
                .attachments
                .get(url)
                .into_iter()
                .flatten()
                .map(|(issue_id, identifier)| IssueAttachment {
                    issue_id: issue_id.clone(),
                    issue_identifier: identifier.clone(),
                    matching_comment_ids: comments
                        .get(issue_id)
                        .into_iter()
                        .flatten()
                        .enumerate()
                        .filter(|(_, body)| body.as_str() == comment_body)
                        .map(|(index, _)| format!("{issue_id}-comment-{index}"))
                        .collect(),
                })
                .collect())
        }

        async fn create_comment(&self, issue_id: &str, body: &str) -> GatewayResult<()> {
            if self.failing_issue_ids.iter().any(|id| id == issue_id) {
                return Err(GatewayError::Rejected {
                    operation: "commentCreate".to_string(),
                });
            }
            self.comments
                .lock()
                .unwrap()
                .entry(issue_id.to_string())
                .or_default()
                .push(body.to_string());
            Ok(())
        }
    }

    pub fn commit(sha: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
        }
    }

    pub fn history(shas: &[&str]) -> Vec<Commit> {
        shas.iter().map(|sha| commit(sha)).collect()
    }

    pub fn run(id: u64, head_sha: &str, conclusion: Option<Conclusion>) -> WorkflowRun {
        WorkflowRun {
            id,
            head_sha: head_sha.to_string(),
            conclusion,
            run_number: id,
            created_at: None,
        }
    }

    pub fn comparison(
        status: ComparisonStatus,
        deployed_sha: &str,
        head_sha: &str,
        behind_by: u32,
    ) -> CommitComparison {
        CommitComparison {
            status,
            ahead_by: 0,
            behind_by,
            commits: Vec::new(),
            base_commit: commit(deployed_sha),
            merge_base_commit: commit(head_sha),
        }
    }

    pub fn merged_pull_request(number: u64, title: &str) -> PullRequest {
        PullRequest {
            url: format!("https://github.com/acme/app/pull/{number}"),
            title: title.to_string(),
            number,
            state: PullRequestState::Closed,
            merged_at: Some("2024-05-01T10:00:00Z".to_string()),
        }
    }
}
