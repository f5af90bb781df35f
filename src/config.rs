use anyhow::{Context, Result};
use log::LevelFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use crate::auth::{LinearToken, Token};
use crate::error::ReporterError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_LINEAR_API_URL: &str = "https://api.linear.app/graphql";
pub const DEFAULT_COMMENT_BODY: &str =
    "This issue was deployed with [{{ pullRequest.title }}]({{ pullRequest.url }})";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepts `deploy.yml`, `.github/workflows/deploy.yml` or a full workflow ref
/// such as `owner/repo/.github/workflows/deploy.yml@refs/heads/main`.
static WORKFLOW_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?([^/]+\.ya?ml)(@.+)?$").unwrap());

static COMMIT_SHA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").unwrap());

/// Configuration file structure.
///
/// Every field is optional here; command line values override file values and
/// [`Settings::try_from`] checks that everything required ended up set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub linear: LinearConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    /// Minimum log level (`error`, `warn`, `info`, `debug`, `trace`, `off`)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub token with read access to actions, contents and pull requests
    pub token: Option<String>,

    /// GitHub API base URL
    pub api_url: Option<String>,

    /// Repository path (e.g., 'owner/repo')
    pub repository: Option<String>,

    /// Deployment workflow file name or workflow ref
    pub workflow: Option<String>,

    /// Job that performs the deploy
    pub job_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinearConfig {
    /// Linear personal API key
    pub api_key: Option<String>,

    /// Linear OAuth access token
    pub access_token: Option<String>,

    /// Linear GraphQL endpoint
    pub api_url: Option<String>,

    /// Comment template, see `deploy::template`
    pub comment_body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeployConfig {
    /// Commit sha that was just deployed
    pub commit_sha: Option<String>,

    /// Look everything up but don't create comments
    pub dry_run: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./deployed-prs.toml
    /// 3. ./deployed-prs.json
    /// 4. ./deployed-prs.yaml
    /// 5. ./deployed-prs.yml
    ///
    /// Returns default configuration if no file is found. A specified path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "deployed-prs.toml",
            "deployed-prs.json",
            "deployed-prs.yaml",
            "deployed-prs.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Overlay `overrides` on top of `self`; set values in `overrides` win.
    pub fn merged_with(self, overrides: Config) -> Self {
        Self {
            github: GitHubConfig {
                token: overrides.github.token.or(self.github.token),
                api_url: overrides.github.api_url.or(self.github.api_url),
                repository: overrides.github.repository.or(self.github.repository),
                workflow: overrides.github.workflow.or(self.github.workflow),
                job_name: overrides.github.job_name.or(self.github.job_name),
            },
            linear: LinearConfig {
                api_key: overrides.linear.api_key.or(self.linear.api_key),
                access_token: overrides.linear.access_token.or(self.linear.access_token),
                api_url: overrides.linear.api_url.or(self.linear.api_url),
                comment_body: overrides.linear.comment_body.or(self.linear.comment_body),
            },
            deploy: DeployConfig {
                commit_sha: overrides.deploy.commit_sha.or(self.deploy.commit_sha),
                dry_run: overrides.deploy.dry_run.or(self.deploy.dry_run),
            },
            log_level: overrides.log_level.or(self.log_level),
        }
    }

    pub fn log_level(&self) -> &str {
        non_empty(&self.log_level).unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Fully resolved inputs of a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_token: Token,
    pub github_api_url: String,
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    pub job_name: String,
    pub deployed_sha: String,
    pub dry_run: bool,
    pub linear_token: LinearToken,
    pub linear_api_url: String,
    pub comment_body: String,
    pub log_level: LevelFilter,
}

impl TryFrom<Config> for Settings {
    type Error = ReporterError;

    /// Validates every input and reports all problems at once.
    fn try_from(config: Config) -> Result<Self, Self::Error> {
        let mut problems = Vec::new();

        let github_token = required(&config.github.token, "github-token", &mut problems);

        let repository = required(&config.github.repository, "repository", &mut problems)
            .and_then(|repository| match parse_repository(&repository) {
                Ok(parts) => Some(parts),
                Err(reason) => {
                    problems.push(invalid("repository", &reason));
                    None
                }
            });

        let workflow = required(&config.github.workflow, "workflow", &mut problems).and_then(
            |workflow| match parse_workflow_file_name(&workflow) {
                Ok(file_name) => Some(file_name),
                Err(reason) => {
                    problems.push(invalid("workflow", &reason));
                    None
                }
            },
        );

        let job_name = required(&config.github.job_name, "job-name", &mut problems);

        let deployed_sha = required(&config.deploy.commit_sha, "deployed-commit-sha", &mut problems)
            .and_then(|sha| {
                if COMMIT_SHA.is_match(&sha) {
                    Some(sha)
                } else {
                    problems.push(invalid(
                        "deployed-commit-sha",
                        &format!("Expected 7 to 40 hexadecimal characters (received \"{sha}\")"),
                    ));
                    None
                }
            });

        let linear_token = match (
            non_empty(&config.linear.api_key),
            non_empty(&config.linear.access_token),
        ) {
            (Some(key), None) => Some(LinearToken::PersonalApiKey(Token::from(key))),
            (None, Some(token)) => Some(LinearToken::OAuthAccessToken(Token::from(token))),
            (Some(_), Some(_)) => {
                problems.push(invalid(
                    "linear-api-key",
                    "Set either linear-api-key or linear-access-token, not both",
                ));
                None
            }
            (None, None) => {
                problems.push(missing("linear-api-key"));
                None
            }
        };

        let log_level = match config.log_level().parse::<LevelFilter>() {
            Ok(level) => Some(level),
            Err(_) => {
                problems.push(invalid(
                    "log-level",
                    &format!("Unknown level \"{}\"", config.log_level()),
                ));
                None
            }
        };

        match (
            github_token,
            repository,
            workflow,
            job_name,
            deployed_sha,
            linear_token,
            log_level,
        ) {
            (
                Some(github_token),
                Some((owner, repo)),
                Some(workflow),
                Some(job_name),
                Some(deployed_sha),
                Some(linear_token),
                Some(log_level),
            ) if problems.is_empty() => Ok(Self {
                github_token: Token::from(github_token),
                github_api_url: non_empty(&config.github.api_url)
                    .unwrap_or(DEFAULT_GITHUB_API_URL)
                    .to_string(),
                owner,
                repo,
                workflow,
                job_name,
                deployed_sha,
                dry_run: config.deploy.dry_run.unwrap_or(false),
                linear_token,
                linear_api_url: non_empty(&config.linear.api_url)
                    .unwrap_or(DEFAULT_LINEAR_API_URL)
                    .to_string(),
                comment_body: non_empty(&config.linear.comment_body)
                    .unwrap_or(DEFAULT_COMMENT_BODY)
                    .to_string(),
                log_level,
            }),
            _ => Err(ReporterError::Config(problems)),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn required(value: &Option<String>, name: &str, problems: &mut Vec<String>) -> Option<String> {
    let value = non_empty(value).map(ToString::to_string);
    if value.is_none() {
        problems.push(missing(name));
    }
    value
}

fn missing(name: &str) -> String {
    format!("Input \"{name}\" is missing")
}

fn invalid(name: &str, reason: &str) -> String {
    format!("Input \"{name}\" is invalid: {reason}")
}

fn parse_repository(repository: &str) -> std::result::Result<(String, String), String> {
    match repository.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(format!(
            "Repository must be in format 'owner/repo' (received \"{repository}\")"
        )),
    }
}

/// Extracts the workflow file name GitHub's API expects as a workflow id.
pub fn parse_workflow_file_name(value: &str) -> std::result::Result<String, String> {
    WORKFLOW_FILE
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|file_name| file_name.as_str().to_string())
        .ok_or_else(|| format!("Could not parse file name (received \"{value}\")"))
}
