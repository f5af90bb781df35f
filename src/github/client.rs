use async_trait::async_trait;
use log::trace;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

use crate::auth::Token;
use crate::error::GatewayError;
use crate::gateway::{GatewayResult, SourceControl};
use crate::model::{Commit, CommitComparison, JobOutcome, PullRequest, WorkflowRun};

const MAX_CONCURRENT_REQUESTS: usize = 50;
const JOBS_PAGE_SIZE: u32 = 100;
/// GitHub refuses larger pages for commit listings.
const MAX_COMMITS_PAGE_SIZE: u32 = 100;

/// GitHub REST client scoped to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    /// Repository root, e.g. `https://api.github.com/repos/owner/repo/`
    repo_url: Url,
    semaphore: Arc<Semaphore>,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `owner` - Repository owner/organization
    /// * `repo` - Repository name
    /// * `token` - GitHub token
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, owner: &str, repo: &str, token: &Token) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| GatewayError::InvalidHeader(format!("GitHub token: {e}")))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .user_agent(concat!("deployed-prs/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let repo_url = Url::parse(&base)
            .and_then(|url| url.join(&format!("repos/{owner}/{repo}/")))
            .map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            repo_url,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    fn endpoint(&self, path: &str) -> GatewayResult<Url> {
        self.repo_url
            .join(path)
            .map_err(|e| GatewayError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;

        // The semaphore is never closed.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("GitHub request semaphore closed");

        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!("GitHub GET {path} returned {} bytes", body.len());

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn list_recent_runs(
        &self,
        workflow: &str,
        page_size: u8,
    ) -> GatewayResult<Vec<WorkflowRun>> {
        let response: WorkflowRunsResponse = self
            .get(
                &format!("actions/workflows/{workflow}/runs"),
                &[("per_page", page_size.to_string())],
            )
            .await?;

        trace!(
            "{} total workflow runs found, received {}",
            response.total_count,
            response.workflow_runs.len()
        );

        Ok(response.workflow_runs)
    }

    async fn list_jobs(&self, run_id: u64) -> GatewayResult<Vec<JobOutcome>> {
        let response: WorkflowJobsResponse = self
            .get(
                &format!("actions/runs/{run_id}/jobs"),
                &[("per_page", JOBS_PAGE_SIZE.to_string())],
            )
            .await?;

        Ok(response.jobs)
    }

    async fn compare(&self, base_sha: &str, head_sha: &str) -> GatewayResult<CommitComparison> {
        self.get(&format!("compare/{base_sha}...{head_sha}"), &[])
            .await
    }

    async fn list_commits(
        &self,
        starting_sha: &str,
        max_count: u32,
    ) -> GatewayResult<Vec<Commit>> {
        self.get(
            "commits",
            &[
                ("sha", starting_sha.to_string()),
                ("per_page", max_count.min(MAX_COMMITS_PAGE_SIZE).to_string()),
            ],
        )
        .await
    }

    async fn list_pull_requests_for_commit(&self, sha: &str) -> GatewayResult<Vec<PullRequest>> {
        self.get(&format!("commits/{sha}/pulls"), &[]).await
    }
}

/// Response from GitHub API for workflow runs.
#[derive(Deserialize)]
struct WorkflowRunsResponse {
    #[serde(default)]
    total_count: u64,
    workflow_runs: Vec<WorkflowRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Deserialize)]
struct WorkflowJobsResponse {
    jobs: Vec<JobOutcome>,
}
