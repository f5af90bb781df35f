use log::info;
use std::sync::Arc;

use crate::config::Settings;
use crate::deploy::{aggregate, DeployResolver, Dispatcher, NotificationOutcome};
use crate::error::{ReporterError, Result};
use crate::gateway::{IssueTracker, SourceControl};
use crate::github::GitHubClient;
use crate::linear::LinearClient;
use crate::model::{CommitRange, PullRequest};

/// What a run needs besides the two gateways.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workflow: String,
    pub job_name: String,
    pub deployed_sha: String,
    pub comment_body: String,
    pub dry_run: bool,
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            workflow: settings.workflow.clone(),
            job_name: settings.job_name.clone(),
            deployed_sha: settings.deployed_sha.clone(),
            comment_body: settings.comment_body.clone(),
            dry_run: settings.dry_run,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub range: CommitRange,
    pub pull_requests: Vec<PullRequest>,
    pub notifications: Vec<NotificationOutcome>,
    pub dry_run: bool,
}

/// Resolve the deploy delta, collect its pull requests and notify their issues.
pub struct Pipeline {
    source: Arc<dyn SourceControl>,
    tracker: Arc<dyn IssueTracker>,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn SourceControl>,
        tracker: Arc<dyn IssueTracker>,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            tracker,
            options,
        }
    }

    /// Builds the pipeline on top of the GitHub and Linear APIs.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let github = GitHubClient::new(
            &settings.github_api_url,
            &settings.owner,
            &settings.repo,
            &settings.github_token,
        )
        .map_err(|e| ReporterError::gateway("Could not create GitHub client", e))?;

        let linear = LinearClient::new(&settings.linear_api_url, &settings.linear_token)
            .map_err(|e| ReporterError::gateway("Could not create Linear client", e))?;

        Ok(Self::new(
            Arc::new(github),
            Arc::new(linear),
            RunOptions::from(settings),
        ))
    }

    pub async fn run(&self) -> Result<RunReport> {
        let options = &self.options;
        if options.dry_run {
            info!("Dry run enabled, no comments will be created");
        }

        let range = DeployResolver::new(self.source.as_ref(), &options.workflow)
            .resolve(&options.job_name, &options.deployed_sha)
            .await?;

        let pull_requests = aggregate(self.source.as_ref(), &range.commits).await?;

        let notifications =
            Dispatcher::new(self.tracker.as_ref(), &options.comment_body, options.dry_run)
                .dispatch(&pull_requests)
                .await?;

        Ok(RunReport {
            range,
            pull_requests,
            notifications,
            dry_run: options.dry_run,
        })
    }
}
