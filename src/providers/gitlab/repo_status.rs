use log::warn;

use super::client::GitLabClient;
use super::types::{Commit, RawCommitDetail, RawJob, RawPipeline, RepoBuildStatus};
use crate::providers::Capability;
use crate::status::RunStatus;

/// One (repository, branch) pair to resolve a build status for.
#[derive(Debug, Clone)]
pub struct RepoTarget {
    pub name: String,
    pub full_path: String,
    pub branch: String,
}

/// Resolve the latest build status for every target.
///
/// Lookups are independent and issued concurrently; the results are joined
/// before any downstream reduction runs. A missing access token degrades the
/// whole capability rather than erroring.
pub async fn collect_repo_statuses(
    client: &GitLabClient,
    targets: &[RepoTarget],
) -> Capability<Vec<RepoBuildStatus>> {
    if !client.has_token() {
        return Capability::Unavailable;
    }

    let lookups: Vec<_> = targets
        .iter()
        .map(|target| fetch_repo_status(client, target))
        .collect();

    Capability::Available(futures::future::join_all(lookups).await)
}

/// Latest pipeline outcome for one (repository, branch) pair.
///
/// Any lookup failure is recovered locally: the returned record keeps the
/// repository name and an empty status, which classifies as pending.
async fn fetch_repo_status(client: &GitLabClient, target: &RepoTarget) -> RepoBuildStatus {
    let fallback = RepoBuildStatus {
        name: target.name.clone(),
        full_path: target.full_path.clone(),
        ..RepoBuildStatus::default()
    };

    let pipeline = match latest_pipeline(client, &target.full_path, &target.branch).await {
        Ok(Some(pipeline)) => pipeline,
        Ok(None) => {
            warn!(
                "No pipelines found for {}@{}",
                target.full_path, target.branch
            );
            return fallback;
        }
        Err(e) => {
            warn!(
                "Pipeline lookup failed for {}@{}: {e}",
                target.full_path, target.branch
            );
            return fallback;
        }
    };

    let status = RunStatus::parse(&pipeline.status);

    let commit = match &pipeline.sha {
        Some(sha) => commit_for_sha(client, &target.full_path, sha)
            .await
            .unwrap_or_else(|e| {
                warn!("Commit lookup failed for {}@{sha}: {e}", target.full_path);
                Commit::default()
            }),
        None => Commit::default(),
    };

    let failed_job = if status == RunStatus::Failed {
        first_failed_job_path(client, &target.full_path, pipeline.id)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    "Failed-job lookup failed for {} run {}: {e}",
                    target.full_path, pipeline.id
                );
                String::new()
            })
    } else {
        String::new()
    };

    RepoBuildStatus {
        name: target.name.clone(),
        full_path: target.full_path.clone(),
        pipeline_id: pipeline.id.to_string(),
        status,
        commit,
        failed_job,
    }
}

async fn latest_pipeline(
    client: &GitLabClient,
    full_path: &str,
    branch: &str,
) -> crate::error::Result<Option<RawPipeline>> {
    let mut url = client
        .project_url(full_path)?
        .join("pipelines")
        .map_err(|e| crate::error::BuildWatchError::Config(format!("Invalid pipelines URL: {e}")))?;
    url.set_query(Some(&format!("ref={branch}&per_page=1")));

    let mut pipelines: Vec<RawPipeline> = client.get_json(url).await?;
    Ok(if pipelines.is_empty() {
        None
    } else {
        Some(pipelines.remove(0))
    })
}

async fn commit_for_sha(
    client: &GitLabClient,
    full_path: &str,
    sha: &str,
) -> crate::error::Result<Commit> {
    let url = client
        .project_url(full_path)?
        .join(&format!("repository/commits/{sha}"))
        .map_err(|e| crate::error::BuildWatchError::Config(format!("Invalid commit URL: {e}")))?;

    let detail: RawCommitDetail = client.get_json(url).await?;
    Ok(Commit {
        id: detail.id,
        author: detail.author_name,
    })
}

async fn first_failed_job_path(
    client: &GitLabClient,
    full_path: &str,
    pipeline_id: u64,
) -> crate::error::Result<String> {
    let mut url = client
        .project_url(full_path)?
        .join(&format!("pipelines/{pipeline_id}/jobs"))
        .map_err(|e| crate::error::BuildWatchError::Config(format!("Invalid jobs URL: {e}")))?;
    url.set_query(Some("scope[]=failed&per_page=1"));

    let jobs: Vec<RawJob> = client.get_json(url).await?;
    Ok(jobs
        .first()
        .and_then(|job| job.web_url.as_deref())
        .map(|web_url| {
            web_url
                .strip_prefix(client.base_url())
                .unwrap_or(web_url)
                .to_string()
        })
        .unwrap_or_default())
}
