use futures::future::try_join_all;
use log::{debug, trace, warn};

use crate::error::{ReporterError, Result};
use crate::gateway::SourceControl;
use crate::model::{short_sha, Commit, CommitComparison, CommitRange, ComparisonStatus, WorkflowRun};

/// How many recent workflow runs are searched for a previous deploy.
pub const RUNS_PAGE_SIZE: u8 = 10;

/// Upper bound on commits fetched when the previous deploy is far behind.
/// Older pull requests beyond this window are not reported.
pub const MAX_COMMITS_LOOKBACK: u32 = 100;

/// Finds the closest previous successful deploy and the commits shipped since.
pub struct DeployResolver<'a> {
    source: &'a dyn SourceControl,
    workflow: &'a str,
}

impl<'a> DeployResolver<'a> {
    pub fn new(source: &'a dyn SourceControl, workflow: &'a str) -> Self {
        Self { source, workflow }
    }

    /// Resolves the commits introduced by the deploy of `deployed_sha`.
    ///
    /// A run counts as a successful deploy when it concluded successfully or when
    /// its job named `target_job_name` did.
    ///
    /// # Errors
    ///
    /// - [`ReporterError::NoWorkflowRuns`] if the workflow has never run
    /// - [`ReporterError::NoPreviousDeploy`] if no successful deploy is an ancestor of `deployed_sha`
    /// - [`ReporterError::NoCommitsSinceDeploy`] if the range is empty
    /// - [`ReporterError::Gateway`] if any GitHub request fails
    pub async fn resolve(&self, target_job_name: &str, deployed_sha: &str) -> Result<CommitRange> {
        let runs = self.recent_runs().await?;

        let candidates = try_join_all(
            runs.iter()
                .map(|run| self.comparison_for_run(run, target_job_name, deployed_sha)),
        )
        .await?;

        let closest = select_closest(candidates.into_iter().flatten())
            .ok_or(ReporterError::NoPreviousDeploy)?;

        debug!(
            "Closest comparison with commit {}: status {:?}, behind by {} and ahead by {}",
            short_sha(&closest.merge_base_commit.sha),
            closest.status,
            closest.behind_by,
            closest.ahead_by
        );

        self.commits_since(&closest).await
    }

    async fn recent_runs(&self) -> Result<Vec<WorkflowRun>> {
        let runs = self
            .source
            .list_recent_runs(self.workflow, RUNS_PAGE_SIZE)
            .await
            .map_err(|e| ReporterError::gateway("Could not list workflow runs", e))?;

        if runs.is_empty() {
            return Err(ReporterError::NoWorkflowRuns);
        }

        debug!("Processing {} most recent workflow runs", runs.len());
        Ok(runs)
    }

    /// Comparison against the deployed commit, if the run deployed and is behind it.
    async fn comparison_for_run(
        &self,
        run: &WorkflowRun,
        target_job_name: &str,
        deployed_sha: &str,
    ) -> Result<Option<CommitComparison>> {
        if !self.was_deploy_successful(run, target_job_name).await? {
            return Ok(None);
        }

        let head_sha = &run.head_sha;
        let comparison = self
            .source
            .compare(deployed_sha, head_sha)
            .await
            .map_err(|e| {
                ReporterError::gateway(
                    format!("Could not compare commits {deployed_sha}...{head_sha}"),
                    e,
                )
            })?;

        let short = short_sha(head_sha);
        match comparison.status {
            ComparisonStatus::Behind => {
                debug!(
                    "Commit {short} is behind deployed commit by {} commits, processing further",
                    comparison.behind_by
                );
                Ok(Some(comparison))
            }
            ComparisonStatus::Identical => {
                debug!("Commit {short} is identical to deployed commit, dropping");
                Ok(None)
            }
            ComparisonStatus::Diverged => {
                debug!(
                    "Commit {short} is diverged from deployed commit, {} ahead and {} behind, dropping",
                    comparison.ahead_by, comparison.behind_by
                );
                Ok(None)
            }
            ComparisonStatus::Ahead => {
                debug!(
                    "Commit {short} is ahead of deployed commit by {} commits, dropping",
                    comparison.ahead_by
                );
                Ok(None)
            }
        }
    }

    async fn was_deploy_successful(&self, run: &WorkflowRun, target_job_name: &str) -> Result<bool> {
        let short = short_sha(&run.head_sha);

        if run.succeeded() {
            debug!(
                "Workflow run #{} at commit {short} from {} completed successfully",
                run.run_number,
                run.created_label()
            );
            return Ok(true);
        }

        let jobs = self.source.list_jobs(run.id).await.map_err(|e| {
            ReporterError::gateway(format!("Could not list jobs for workflow run {}", run.id), e)
        })?;
        trace!("Workflow run {} has {} jobs", run.id, jobs.len());

        match jobs.iter().find(|job| job.name == target_job_name) {
            Some(job) if job.succeeded() => {
                debug!("Job at commit {short} completed successfully");
                Ok(true)
            }
            Some(_) => {
                debug!("Job at commit {short} did not complete successfully, dropping");
                Ok(false)
            }
            None => {
                debug!(
                    "Job with name {target_job_name} not found in workflow run at commit {short}, dropping"
                );
                Ok(false)
            }
        }
    }

    async fn commits_since(&self, comparison: &CommitComparison) -> Result<CommitRange> {
        let last_deploy_sha = comparison.merge_base_commit.sha.clone();
        let behind_by = comparison.behind_by;

        // The comparison already lists the range, which never includes the previous deploy.
        if comparison.commits.len() == behind_by as usize {
            return into_range(comparison.commits.clone(), last_deploy_sha, behind_by, false);
        }

        let max_count = if behind_by >= MAX_COMMITS_LOOKBACK {
            debug!(
                "Commit from closest comparison is too far behind, only checking last {MAX_COMMITS_LOOKBACK} commits"
            );
            MAX_COMMITS_LOOKBACK
        } else {
            behind_by + 1
        };

        let start_sha = &comparison.base_commit.sha;
        let fetched = self
            .source
            .list_commits(start_sha, max_count)
            .await
            .map_err(|e| {
                ReporterError::gateway(format!("Could not list commits for SHA {start_sha}"), e)
            })?;

        let (commits, truncated) = truncate_at_deploy(fetched, &last_deploy_sha);
        if truncated {
            warn!(
                "Could not find commit {last_deploy_sha} from last deployment that is behind by {behind_by} commits. Some associated pull requests may be left out"
            );
        }

        into_range(commits, last_deploy_sha, behind_by, truncated)
    }
}

fn into_range(
    commits: Vec<Commit>,
    last_deploy_sha: String,
    last_deploy_behind_by: u32,
    truncated: bool,
) -> Result<CommitRange> {
    if commits.is_empty() {
        return Err(ReporterError::NoCommitsSinceDeploy);
    }

    debug!("{} commits found since previous deploy", commits.len());
    Ok(CommitRange {
        commits,
        last_deploy_sha,
        last_deploy_behind_by,
        truncated,
    })
}

/// Picks the `behind` comparison with the smallest `behind_by`.
///
/// Input order carries no meaning; candidates arrive in completion order.
pub fn select_closest(
    comparisons: impl IntoIterator<Item = CommitComparison>,
) -> Option<CommitComparison> {
    comparisons
        .into_iter()
        .filter(|comparison| comparison.status == ComparisonStatus::Behind)
        .min_by_key(|comparison| comparison.behind_by)
}

/// Keeps the commits strictly newer than `last_deploy_sha`.
///
/// Returns the whole list and `true` when the sha isn't in it.
pub fn truncate_at_deploy(mut commits: Vec<Commit>, last_deploy_sha: &str) -> (Vec<Commit>, bool) {
    match commits.iter().position(|commit| commit.sha == last_deploy_sha) {
        Some(index) => {
            commits.truncate(index);
            (commits, false)
        }
        None => (commits, true),
    }
}
