use futures::future::join_all;
use log::{debug, error, info};

use crate::error::{ReporterError, Result};
use crate::gateway::IssueTracker;
use crate::model::{IssueAttachment, PullRequest};

use super::template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Created,
    AlreadyNotified,
    /// Dry run: a comment would have been created.
    WouldCreate,
}

impl NotifyAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "commented",
            Self::AlreadyNotified => "already notified",
            Self::WouldCreate => "would comment (dry run)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub pull_request_url: String,
    pub issue_identifier: String,
    pub action: NotifyAction,
}

/// Comments on every issue linked to a deployed pull request, at most once per
/// (pull request, issue, body).
pub struct Dispatcher<'a> {
    tracker: &'a dyn IssueTracker,
    template: &'a str,
    dry_run: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, template: &'a str, dry_run: bool) -> Self {
        Self {
            tracker,
            template,
            dry_run,
        }
    }

    /// Notifies all pull requests concurrently.
    ///
    /// One failing issue does not stop the others: every task runs to completion and
    /// each failure is logged before the run is failed with
    /// [`ReporterError::Notification`].
    pub async fn dispatch(&self, pull_requests: &[PullRequest]) -> Result<Vec<NotificationOutcome>> {
        let results: Vec<Result<NotificationOutcome>> = join_all(
            pull_requests
                .iter()
                .map(|pull_request| self.notify_pull_request(pull_request)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        let total = results.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut failed = 0;

        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    failed += 1;
                    error!("{e}");
                    for message in e.messages() {
                        error!("  {message}");
                    }
                }
            }
        }

        if failed > 0 {
            return Err(ReporterError::Notification { failed, total });
        }

        Ok(outcomes)
    }

    async fn notify_pull_request(&self, pull_request: &PullRequest) -> Vec<Result<NotificationOutcome>> {
        let body = template::render(self.template, pull_request);
        debug!("Comment body for pull request {}: {body}", pull_request.url);

        let attachments = match self
            .tracker
            .find_issues_by_attachment_url(&pull_request.url, &body)
            .await
        {
            Ok(attachments) => attachments,
            Err(e) => {
                return vec![Err(ReporterError::gateway(
                    format!("Could not get issue view for attachment URL {}", pull_request.url),
                    e,
                ))]
            }
        };

        if attachments.is_empty() {
            debug!("No issues linked to pull request {}", pull_request.url);
        }

        join_all(
            attachments
                .iter()
                .map(|attachment| self.notify_issue(pull_request, attachment, &body)),
        )
        .await
    }

    async fn notify_issue(
        &self,
        pull_request: &PullRequest,
        attachment: &IssueAttachment,
        body: &str,
    ) -> Result<NotificationOutcome> {
        let identifier = &attachment.issue_identifier;

        let action = if attachment.already_notified() {
            info!("Not adding comment to issue {identifier} because it already has deploy comment");
            NotifyAction::AlreadyNotified
        } else if self.dry_run {
            info!("Dry run: Would have created comment for issue {identifier}");
            debug!("Comment body: {body}");
            NotifyAction::WouldCreate
        } else {
            self.tracker
                .create_comment(&attachment.issue_id, body)
                .await
                .map_err(|e| {
                    ReporterError::gateway(
                        format!("Could not create comment for issue {identifier}"),
                        e,
                    )
                })?;
            info!("Added comment to issue {identifier}");
            debug!("Comment body: {body}");
            NotifyAction::Created
        };

        Ok(NotificationOutcome {
            pull_request_url: pull_request.url.clone(),
            issue_identifier: identifier.clone(),
            action,
        })
    }
}
