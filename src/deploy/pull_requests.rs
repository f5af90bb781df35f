use futures::future::try_join_all;
use indexmap::IndexMap;
use log::{debug, info};

use crate::error::{ReporterError, Result};
use crate::gateway::SourceControl;
use crate::model::{Commit, PullRequest};

/// Resolves the merged pull requests associated with a range of commits.
///
/// A pull request linked to several commits is kept once, with the attributes
/// from the first commit (in range order) that referenced it.
pub async fn aggregate(source: &dyn SourceControl, commits: &[Commit]) -> Result<Vec<PullRequest>> {
    let per_commit = try_join_all(
        commits
            .iter()
            .map(|commit| merged_pull_requests_for_commit(source, commit)),
    )
    .await?;

    let pull_requests = dedup_by_url(per_commit.into_iter().flatten());

    info!(
        "Found {} pull request{} associated with current deployment",
        pull_requests.len(),
        plural(pull_requests.len())
    );
    for pull_request in &pull_requests {
        info!("{} → {}", pull_request.url, pull_request.title);
    }

    Ok(pull_requests)
}

async fn merged_pull_requests_for_commit(
    source: &dyn SourceControl,
    commit: &Commit,
) -> Result<Vec<PullRequest>> {
    let pull_requests = source
        .list_pull_requests_for_commit(&commit.sha)
        .await
        .map_err(|e| {
            ReporterError::gateway(
                format!("Could not list pull requests associated with commit {}", commit.sha),
                e,
            )
        })?;

    let merged: Vec<_> = pull_requests
        .into_iter()
        .filter(PullRequest::is_merged)
        .collect();

    debug!(
        "{} merged pull request{} found associated with commit {}",
        merged.len(),
        plural(merged.len()),
        commit.short_sha()
    );

    Ok(merged)
}

/// First-seen wins; iteration order is insertion order.
pub fn dedup_by_url(pull_requests: impl IntoIterator<Item = PullRequest>) -> Vec<PullRequest> {
    let mut by_url: IndexMap<String, PullRequest> = IndexMap::new();
    for pull_request in pull_requests {
        by_url
            .entry(normalize_url(&pull_request.url))
            .or_insert(pull_request);
    }
    by_url.into_values().collect()
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fakes::{history, merged_pull_request, FakeSourceControl};
    use crate::model::PullRequestState;

    #[test]
    fn test_dedup_keeps_first_seen() {
        let first = merged_pull_request(1, "Original title");
        let mut duplicate = merged_pull_request(1, "Later title");
        duplicate.url.push('/');
        let other = merged_pull_request(2, "Other");

        let deduped = dedup_by_url(vec![first.clone(), other.clone(), duplicate]);

        assert_eq!(deduped, vec![first, other]);
    }

    #[tokio::test]
    async fn test_aggregate_filters_and_dedups() {
        let shared = merged_pull_request(1, "Shared");
        let mut open = merged_pull_request(2, "Still open");
        open.state = PullRequestState::Open;
        let mut unmerged = merged_pull_request(3, "Closed without merge");
        unmerged.merged_at = Some(String::new());
        let solo = merged_pull_request(4, "Solo");

        let mut source = FakeSourceControl::default();
        source
            .pull_requests
            .insert("A".to_string(), vec![shared.clone(), open]);
        source
            .pull_requests
            .insert("A1".to_string(), vec![shared.clone(), unmerged]);
        source
            .pull_requests
            .insert("A2".to_string(), vec![solo.clone(), shared.clone()]);

        let pull_requests = aggregate(&source, &history(&["A", "A1", "A2"])).await.unwrap();

        assert_eq!(pull_requests, vec![shared, solo]);
    }

    #[tokio::test]
    async fn test_aggregate_fails_when_any_lookup_fails() {
        let source = FakeSourceControl {
            failing_shas: vec!["A1".to_string()],
            ..Default::default()
        };

        let result = aggregate(&source, &history(&["A", "A1"])).await;

        tokio_test::assert_err!(&result);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Could not list pull requests associated with commit A1"
        );
    }
}
