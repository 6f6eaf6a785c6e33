use std::collections::HashMap;

use log::warn;

use super::client::GitLabClient;
use super::history::PAGE_SIZE;
use super::types::{PipelineRun, RawJob, RetryInfo, TestReportSummary, TestReportSummaryResponse};

/// Detail fetched for one run. Falls back to zeroed values per field, so a
/// failed summary lookup does not discard successfully fetched retry data.
#[derive(Debug, Default)]
struct RunDetail {
    summary: TestReportSummary,
    retries: RetryInfo,
}

/// Derive retry metadata from a run's job list.
///
/// The provider lists every execution of a retried job under the same name,
/// so a name appearing more than once marks one retried job.
pub fn detect_retries(jobs: &[RawJob]) -> RetryInfo {
    let mut executions_by_name: HashMap<&str, usize> = HashMap::new();
    for job in jobs {
        *executions_by_name.entry(job.name.as_str()).or_insert(0) += 1;
    }

    let retried_job_count = executions_by_name
        .values()
        .filter(|&&count| count > 1)
        .count();

    RetryInfo {
        has_retries: retried_job_count > 0,
        retried_job_count,
    }
}

/// Attach test totals and retry metadata to each run.
///
/// Detail lookups for independent runs are issued concurrently and joined;
/// results are matched back to their run strictly by run identifier. Any
/// lookup failure degrades to the zeroed fallback for that run only.
pub async fn enrich_runs(
    client: &GitLabClient,
    project_path: &str,
    runs: Vec<PipelineRun>,
) -> Vec<PipelineRun> {
    let lookups: Vec<_> = runs
        .iter()
        .map(|run| fetch_run_detail(client, project_path, run.id))
        .collect();

    let mut details: HashMap<u64, RunDetail> =
        futures::future::join_all(lookups).await.into_iter().collect();

    runs.into_iter()
        .map(|mut run| {
            if let Some(detail) = details.remove(&run.id) {
                run.test_report_summary = detail.summary;
                run.retries = detail.retries;
            }
            run
        })
        .collect()
}

async fn fetch_run_detail(
    client: &GitLabClient,
    project_path: &str,
    run_id: u64,
) -> (u64, RunDetail) {
    let mut detail = RunDetail::default();

    match summary_for_run(client, project_path, run_id).await {
        Ok(summary) => detail.summary = summary,
        Err(e) => warn!("Test summary lookup failed for run {run_id}: {e}"),
    }

    match jobs_for_run(client, project_path, run_id).await {
        Ok(jobs) => detail.retries = detect_retries(&jobs),
        Err(e) => warn!("Job lookup failed for run {run_id}: {e}"),
    }

    (run_id, detail)
}

async fn summary_for_run(
    client: &GitLabClient,
    project_path: &str,
    run_id: u64,
) -> crate::error::Result<TestReportSummary> {
    let url = client
        .project_url(project_path)?
        .join(&format!("pipelines/{run_id}/test_report_summary"))
        .map_err(|e| crate::error::BuildWatchError::Config(format!("Invalid summary URL: {e}")))?;

    let response: TestReportSummaryResponse = client.get_json(url).await?;
    Ok(response.total)
}

async fn jobs_for_run(
    client: &GitLabClient,
    project_path: &str,
    run_id: u64,
) -> crate::error::Result<Vec<RawJob>> {
    let mut url = client
        .project_url(project_path)?
        .join(&format!("pipelines/{run_id}/jobs"))
        .map_err(|e| crate::error::BuildWatchError::Config(format!("Invalid jobs URL: {e}")))?;
    url.set_query(Some(&format!("include_retried=true&per_page={PAGE_SIZE}")));

    client.get_json(url).await
}
