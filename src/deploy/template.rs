use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::PullRequest;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap());

type Field = fn(&PullRequest) -> &str;

/// Placeholders the comment template understands.
const FIELDS: &[(&str, Field)] = &[("pullRequest.url", url), ("pullRequest.title", title)];

fn url(pull_request: &PullRequest) -> &str {
    &pull_request.url
}

fn title(pull_request: &PullRequest) -> &str {
    &pull_request.title
}

/// Renders a comment body for `pull_request`.
///
/// `{{ pullRequest.url }}` and `{{ pullRequest.title }}` are substituted (surrounding
/// whitespace inside the braces is optional). Any other `{{ ... }}` token is kept as is.
pub fn render(template: &str, pull_request: &PullRequest) -> String {
    PLACEHOLDER
        .replace_all(template, |captures: &Captures| {
            let key = &captures[1];
            FIELDS
                .iter()
                .find(|(name, _)| *name == key)
                .map_or_else(
                    || captures[0].to_string(),
                    |(_, field)| field(pull_request).to_string(),
                )
        })
        .into_owned()
}
