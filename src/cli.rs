use clap::Parser;
use log::{debug, info, LevelFilter};
use std::path::PathBuf;

use crate::config::{Config, DeployConfig, GitHubConfig, LinearConfig, Settings, DEFAULT_LOG_LEVEL};
use crate::error::{ExitKind, ReporterError};
use crate::output;
use crate::pipeline::{Pipeline, RunReport};

#[derive(Parser)]
#[command(name = "deployed-prs")]
#[command(
    author,
    version,
    about = "Comment on the Linear issues of every pull request shipped by the latest deploy",
    long_about = None
)]
pub struct Cli {
    /// Config file (TOML, JSON or YAML)
    #[arg(short, long, env = "DEPLOYED_PRS_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL")]
    github_api_url: Option<String>,

    /// Repository in 'owner/repo' format
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Deployment workflow file name, path or workflow ref
    #[arg(short, long, env = "WORKFLOW_FILE_NAME")]
    workflow: Option<String>,

    /// Name of the job that performs the deploy
    #[arg(short, long, env = "WORKFLOW_JOB_NAME")]
    job_name: Option<String>,

    /// Commit sha that was just deployed
    #[arg(short = 's', long, env = "DEPLOYED_COMMIT_SHA")]
    deployed_commit_sha: Option<String>,

    /// Look up everything but don't create comments
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    #[arg(long, env = "LINEAR_API_KEY", hide_env_values = true)]
    linear_api_key: Option<String>,

    #[arg(long, env = "LINEAR_ACCESS_TOKEN", hide_env_values = true)]
    linear_access_token: Option<String>,

    #[arg(long, env = "LINEAR_API_URL")]
    linear_api_url: Option<String>,

    /// Comment template; supports {{ pullRequest.url }} and {{ pullRequest.title }}
    #[arg(long, env = "LINEAR_COMMENT_BODY")]
    comment_body: Option<String>,

    /// error, warn, info, debug, trace or off (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

/// Exit status of a run that died on a bug (`EX_SOFTWARE`); clap already uses 2.
pub const DEFECT_EXIT_STATUS: u8 = 70;

/// Why a run did not produce a report.
#[derive(Debug)]
pub enum RunFailure {
    /// The config file could not be read or parsed.
    ConfigFile(anyhow::Error),
    Pipeline(ReporterError),
    /// The pipeline task panicked or was cancelled.
    Defect(tokio::task::JoinError),
}

impl RunFailure {
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Pipeline(e) if e.exit() == ExitKind::Success => 0,
            Self::Pipeline(_) | Self::ConfigFile(_) => 1,
            Self::Defect(_) => DEFECT_EXIT_STATUS,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            github: GitHubConfig {
                token: self.github_token.clone(),
                api_url: self.github_api_url.clone(),
                repository: self.repository.clone(),
                workflow: self.workflow.clone(),
                job_name: self.job_name.clone(),
            },
            linear: LinearConfig {
                api_key: self.linear_api_key.clone(),
                access_token: self.linear_access_token.clone(),
                api_url: self.linear_api_url.clone(),
                comment_body: self.comment_body.clone(),
            },
            deploy: DeployConfig {
                commit_sha: self.deployed_commit_sha.clone(),
                dry_run: self.dry_run.then_some(true),
            },
            log_level: self.log_level.clone(),
        }
    }

    pub async fn execute(&self) -> Result<RunReport, RunFailure> {
        let config = match Config::load(self.config.as_deref()) {
            Ok(config) => config.merged_with(self.overrides()),
            Err(e) => {
                init_logger(logger_level(
                    self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
                ));
                return Err(RunFailure::ConfigFile(e));
            }
        };

        // An unknown level is reported by validation below, so it must not silence the logger.
        init_logger(logger_level(config.log_level()));
        output::print_banner();

        let settings = Settings::try_from(config).map_err(RunFailure::Pipeline)?;
        debug!("Log level {}", settings.log_level);
        info!(
            "Reporting pull requests deployed at {} for {}/{}",
            settings.deployed_sha, settings.owner, settings.repo
        );

        let pipeline = Pipeline::from_settings(&settings).map_err(RunFailure::Pipeline)?;

        // Panics stay inside the task and surface as a JoinError.
        tokio::spawn(async move { pipeline.run().await })
            .await
            .map_err(RunFailure::Defect)?
            .map_err(RunFailure::Pipeline)
    }
}

fn logger_level(level: &str) -> LevelFilter {
    level
        .parse()
        .or_else(|_| DEFAULT_LOG_LEVEL.parse())
        .unwrap_or(LevelFilter::Info)
}

/// `RUST_LOG` wins over the configured level.
fn init_logger(level: LevelFilter) {
    let filter = level.to_string().to_lowercase();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .try_init();
}
