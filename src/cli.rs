use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};

use crate::aggregate::{RepoEntry, Snapshot};
use crate::auth::Token;
use crate::calendar;
use crate::config::Config;
use crate::coverage::CoverageValue;
use crate::notify;
use crate::output::PhaseProgress;
use crate::providers::coveralls::CoverageClient;
use crate::providers::github::GitHubClient;
use crate::providers::gitlab::{
    collect_repo_statuses, enrich_runs, fetch_history, GitLabClient, PipelineRun, RepoTarget,
};
use crate::providers::Capability;

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(author, version, about = "CI Build Status Aggregator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the latest build status of every tracked repository
    Status {
        #[arg(short, long, env = "GITLAB_TOKEN")]
        token: Option<String>,

        #[arg(long, env = "GITHUB_TOKEN")]
        github_token: Option<String>,
    },

    /// Merge scheduled pipeline run history into a per-day view
    Calendar {
        #[arg(short, long, env = "GITLAB_TOKEN")]
        token: Option<String>,

        /// Trailing window length in days
        #[arg(short, long, default_value_t = 35)]
        days: u32,
    },

    /// Deliver build status summaries to the notification webhook
    Notify {
        /// Snapshot files to report on
        #[arg(default_value = "repo-status.json")]
        snapshots: Vec<PathBuf>,

        #[arg(long, env = "SLACK_WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// Bypass the notification window check
        #[arg(long, env = "CI_JOB_MANUAL")]
        manual: bool,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Status {
                token,
                github_token,
            } => {
                self.execute_status(&config, token.as_deref(), github_token.as_deref())
                    .await
            }
            Commands::Calendar { token, days } => {
                self.execute_calendar(&config, token.as_deref(), *days).await
            }
            Commands::Notify {
                snapshots,
                webhook_url,
                manual,
            } => {
                self.execute_notify(&config, snapshots, webhook_url.as_deref(), *manual)
                    .await
            }
        }
    }

    async fn execute_status(
        &self,
        config: &Config,
        token: Option<&str>,
        github_token: Option<&str>,
    ) -> Result<()> {
        info!("Aggregating build status for {} repositories", config.repos.len());

        let token = token
            .map(Token::from)
            .or_else(|| config.gitlab.token.as_deref().map(Token::from));
        let client = GitLabClient::new(&config.gitlab.base_url, token)?;

        // One target per tracked (repository, branch) pair
        let plan: Vec<(crate::config::TrackedRepo, String)> = config
            .repos
            .iter()
            .flat_map(|repo| {
                repo.branches
                    .iter()
                    .map(move |branch| (repo.clone(), branch.clone()))
            })
            .collect();
        let targets: Vec<RepoTarget> = plan
            .iter()
            .map(|(repo, branch)| RepoTarget {
                name: repo.name.clone(),
                full_path: repo.full_path(&config.gitlab.namespace),
                branch: branch.clone(),
            })
            .collect();

        let progress = PhaseProgress::start(3, "Fetching repository statuses");

        let statuses = match collect_repo_statuses(&client, &targets).await {
            Capability::Available(statuses) => statuses,
            Capability::Unavailable => {
                warn!("GitLab token not set; repository statuses degrade to no data");
                targets
                    .iter()
                    .map(|target| crate::providers::gitlab::RepoBuildStatus {
                        name: target.name.clone(),
                        full_path: target.full_path.clone(),
                        ..Default::default()
                    })
                    .collect()
            }
        };

        let progress = progress.advance(
            "Fetched repository statuses",
            "Fetching coverage and dependency data",
        );

        let (coverage_by_repo, pendings_by_repo) = tokio::join!(
            fetch_coverage_readings(config),
            fetch_dependency_pendings(config, github_token),
        );

        let progress = progress.advance("Fetched coverage and dependency data", "Aggregating");

        // Single-threaded fold over the joined results
        let entries: Vec<RepoEntry> = plan
            .iter()
            .zip(statuses)
            .map(|((repo, branch), build_status)| RepoEntry {
                repo: repo.name.clone(),
                branch: branch.clone(),
                area: repo.area,
                build_status,
                coverage: if repo.is_product {
                    Some(
                        coverage_by_repo
                            .get(&repo.name)
                            .copied()
                            .unwrap_or(CoverageValue::Unknown),
                    )
                } else {
                    None
                },
                dependabot_pendings: pendings_by_repo
                    .as_ref()
                    .and_then(|pendings| pendings.get(&repo.name).copied().flatten()),
            })
            .collect();

        let snapshot = Snapshot::build(entries);
        progress.finish("Aggregated build status");

        match &self.output {
            Some(path) => snapshot.write(path)?,
            None => println!("{}", self.to_json(&snapshot)?),
        }

        Ok(())
    }

    async fn execute_calendar(
        &self,
        config: &Config,
        token: Option<&str>,
        days: u32,
    ) -> Result<()> {
        info!(
            "Merging run history for {} pipelines over {days} days",
            config.pipelines.len()
        );

        let token = token
            .map(Token::from)
            .or_else(|| config.gitlab.token.as_deref().map(Token::from));
        let client = GitLabClient::new(&config.gitlab.base_url, token)?;

        let today = Utc::now().date_naive();
        // Deduct today when deriving the cutoff for the trailing window
        let cutoff = today - Duration::days(i64::from(days.saturating_sub(1)));
        let limit = days as usize;

        let progress = PhaseProgress::start(2, "Fetching pipeline run history");

        let lookups: Vec<_> = config
            .pipelines
            .iter()
            .map(|definition| {
                let client = &client;
                async move {
                    let runs: Vec<PipelineRun> =
                        match fetch_history(client, definition, cutoff, limit).await {
                            Ok(Capability::Available(runs)) => {
                                enrich_runs(client, &definition.project, runs).await
                            }
                            Ok(Capability::Unavailable) => {
                                warn!(
                                    "GitLab token not set; no run history for pipeline '{}'",
                                    definition.name
                                );
                                Vec::new()
                            }
                            Err(e) => {
                                warn!("History fetch failed for pipeline '{}': {e}", definition.name);
                                Vec::new()
                            }
                        };
                    (definition.name.clone(), runs)
                }
            })
            .collect();

        let series = futures::future::join_all(lookups).await;

        let progress = progress.advance("Fetched pipeline run history", "Merging by day");
        let calendar_days = calendar::merge_by_day(&series, today, days);
        progress.finish("Merged run history");

        let json = self.to_json(&calendar_days)?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, json)?;
                info!("Calendar written to: {}", path.display());
            }
            None => println!("{json}"),
        }

        Ok(())
    }

    async fn execute_notify(
        &self,
        config: &Config,
        snapshot_paths: &[PathBuf],
        webhook_url: Option<&str>,
        manual: bool,
    ) -> Result<()> {
        info!("Starting notification dispatch");

        let mut notify_config = config.notify.clone();
        if webhook_url.is_some() {
            notify_config.webhook_url = webhook_url.map(ToString::to_string);
        }

        let snapshots: Vec<Snapshot> = snapshot_paths
            .iter()
            .map(|path| {
                Snapshot::read(path)
                    .with_context(|| format!("Failed to load snapshot: {}", path.display()))
            })
            .collect::<Result<_>>()?;

        let sent = notify::dispatch_snapshots(
            &notify_config,
            &config.gitlab.base_url,
            &snapshots,
            Utc::now(),
            manual,
        )
        .await?;

        if !sent {
            info!("Notification window closed; nothing sent");
        }

        Ok(())
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

/// Coverage readings for the product repositories, keyed by repository name.
/// Lookups run concurrently; each failure degrades to unknown on its own.
async fn fetch_coverage_readings(config: &Config) -> HashMap<String, CoverageValue> {
    let coverage_client = match CoverageClient::new(
        &config.coverage.base_url,
        &config.coverage.organization,
        &config.coverage.branch,
    ) {
        Ok(client) => client,
        Err(e) => {
            warn!("Coverage client unavailable: {e}");
            return HashMap::new();
        }
    };

    let product_repos: Vec<&str> = config.product_repos().map(|r| r.name.as_str()).collect();
    let lookups: Vec<_> = product_repos
        .iter()
        .map(|name| {
            let coverage_client = &coverage_client;
            async move { (name.to_string(), coverage_client.fetch_coverage(name).await) }
        })
        .collect();

    futures::future::join_all(lookups).await.into_iter().collect()
}

/// Open dependency-update counts keyed by repository name, or `None` when
/// the GitHub capability is unavailable (no token).
async fn fetch_dependency_pendings(
    config: &Config,
    github_token: Option<&str>,
) -> Option<HashMap<String, Option<u64>>> {
    let token = github_token
        .map(Token::from)
        .or_else(|| config.github.token.as_deref().map(Token::from))?;

    let github = match GitHubClient::new(&config.github.base_url, &config.github.organization, &token)
    {
        Ok(client) => client,
        Err(e) => {
            warn!("GitHub client unavailable: {e}");
            return None;
        }
    };

    let lookups: Vec<_> = config
        .repos
        .iter()
        .map(|repo| {
            let github = &github;
            let name = repo.name.clone();
            async move {
                let count = github.dependency_pendings(&name).await;
                (name, count)
            }
        })
        .collect();

    Some(futures::future::join_all(lookups).await.into_iter().collect())
}
