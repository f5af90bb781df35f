use thiserror::Error;

/// Failure of a single call to GitHub or Linear.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL errors in {operation}: {errors}")]
    GraphQl { operation: String, errors: String },

    #[error("GraphQL response for {0} contained no data")]
    NoResponseData(String),

    #[error("{operation} was not successful")]
    Rejected { operation: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// How the process should terminate for a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Nothing to do; reported, but not a failure.
    Success,
    Failure,
}

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("No workflow runs found")]
    NoWorkflowRuns,

    #[error("No previous successful deploys found")]
    NoPreviousDeploy,

    #[error("No commits found since previous deploy")]
    NoCommitsSinceDeploy,

    #[error("{title}")]
    Gateway {
        title: String,
        #[source]
        source: GatewayError,
    },

    #[error("Could not notify {failed} of {total} linked issues")]
    Notification { failed: usize, total: usize },

    #[error("{}", format_config_problems(.0))]
    Config(Vec<String>),
}

impl ReporterError {
    pub fn gateway(title: impl Into<String>, source: GatewayError) -> Self {
        Self::Gateway {
            title: title.into(),
            source,
        }
    }

    pub fn exit(&self) -> ExitKind {
        match self {
            Self::NoWorkflowRuns | Self::NoPreviousDeploy | Self::NoCommitsSinceDeploy => {
                ExitKind::Success
            }
            Self::Gateway { .. } | Self::Notification { .. } | Self::Config(_) => {
                ExitKind::Failure
            }
        }
    }

    /// Diagnostic lines to print below the error title.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            messages.push(cause.to_string());
            source = cause.source();
        }
        messages
    }
}

fn format_config_problems(problems: &[String]) -> String {
    let heading = if problems.len() == 1 {
        "There was an error with an input.".to_string()
    } else {
        format!("There were {} errors with inputs.", problems.len())
    };

    std::iter::once(heading)
        .chain(problems.iter().cloned())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub type Result<T> = std::result::Result<T, ReporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcomes_exit_successfully() {
        assert_eq!(ReporterError::NoWorkflowRuns.exit(), ExitKind::Success);
        assert_eq!(ReporterError::NoPreviousDeploy.exit(), ExitKind::Success);
        assert_eq!(ReporterError::NoCommitsSinceDeploy.exit(), ExitKind::Success);
    }

    #[test]
    fn test_gateway_error_is_fatal_and_keeps_cause() {
        let error = ReporterError::gateway(
            "Could not compare commits abc...def",
            GatewayError::Api {
                status: 404,
                message: "Not Found".to_string(),
            },
        );

        assert_eq!(error.exit(), ExitKind::Failure);
        assert_eq!(error.to_string(), "Could not compare commits abc...def");
        assert_eq!(error.messages(), vec!["API error (status 404): Not Found"]);
    }

    #[test]
    fn test_config_error_message_lists_every_problem() {
        let single = ReporterError::Config(vec!["Input \"job-name\" is missing".to_string()]);
        assert_eq!(
            single.to_string(),
            "There was an error with an input.\n\nInput \"job-name\" is missing"
        );

        let multiple = ReporterError::Config(vec!["a".to_string(), "b".to_string()]);
        assert!(multiple.to_string().starts_with("There were 2 errors with inputs."));
        assert_eq!(multiple.exit(), ExitKind::Failure);
    }
}
