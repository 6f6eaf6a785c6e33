use chrono::NaiveDate;
use log::{debug, info};
use url::Url;

use super::client::GitLabClient;
use super::types::{PipelineRun, RawPipeline};
use crate::config::PipelineDefinition;
use crate::error::{BuildWatchError, Result};
use crate::providers::Capability;

pub(super) const PAGE_SIZE: usize = 100;

/// Sequential cursor over the pages of a schedule's run listing.
///
/// The listing endpoint sorts ascending by id and offers no descending sort,
/// so the walk starts at the last page (the newest runs) and moves toward
/// page 1. Each page's "next" decision depends on the previous response, so
/// retrieval is strictly sequential.
struct PageCursor<'a> {
    client: &'a GitLabClient,
    endpoint: Url,
    next_page: u64,
}

impl<'a> PageCursor<'a> {
    fn starting_at(client: &'a GitLabClient, endpoint: Url, last_page: u64) -> Self {
        Self {
            client,
            endpoint,
            next_page: last_page,
        }
    }

    async fn next(&mut self) -> Result<Option<Vec<RawPipeline>>> {
        if self.next_page < 1 {
            return Ok(None);
        }

        let mut url = self.endpoint.clone();
        url.set_query(Some(&format!(
            "per_page={PAGE_SIZE}&page={}",
            self.next_page
        )));

        debug!("Fetching history page {}", self.next_page);
        let items = self.client.get_json(url).await?;
        self.next_page -= 1;

        Ok(Some(items))
    }
}

/// Fetch up to `limit` runs of a scheduled pipeline created on or after
/// `cutoff`, newest first.
///
/// One canary request learns the page count from response metadata, then the
/// page cursor walks backward from the last page, reversing each page before
/// concatenation so the accumulated order stays newest-first. The walk stops
/// once `limit` runs cleared the cutoff or pages are exhausted.
///
/// A missing access token is not an error: the capability is reported as
/// unavailable so downstream stages degrade to "no data".
pub async fn fetch_history(
    client: &GitLabClient,
    definition: &PipelineDefinition,
    cutoff: NaiveDate,
    limit: usize,
) -> Result<Capability<Vec<PipelineRun>>> {
    if !client.has_token() {
        return Ok(Capability::Unavailable);
    }

    let endpoint = client
        .project_url(&definition.project)?
        .join(&format!(
            "pipeline_schedules/{}/pipelines",
            definition.schedule_id
        ))
        .map_err(|e| BuildWatchError::Config(format!("Invalid schedule URL: {e}")))?;

    let mut canary_url = endpoint.clone();
    canary_url.set_query(Some(&format!("per_page={PAGE_SIZE}")));

    let (_, total_pages_header) = client
        .get_json_with_header::<Vec<RawPipeline>>(canary_url, "x-total-pages")
        .await?;
    let last_page: u64 = total_pages_header.and_then(|v| v.parse().ok()).unwrap_or(1);

    if limit == 0 {
        return Ok(Capability::Available(Vec::new()));
    }

    let mut cursor = PageCursor::starting_at(client, endpoint, last_page);
    let mut runs: Vec<PipelineRun> = Vec::new();

    while runs.len() < limit {
        let Some(page) = cursor.next().await? else {
            break;
        };

        // The page ascends by creation; reversing keeps the accumulated
        // list newest-first as the walk moves toward older pages.
        let mut kept: Vec<PipelineRun> = page
            .into_iter()
            .filter(|raw| raw.created_at.date_naive() >= cutoff)
            .map(|raw| PipelineRun::from_raw(raw, client.base_url()))
            .collect();
        kept.reverse();
        runs.extend(kept);
    }

    runs.truncate(limit);
    info!(
        "Fetched {} runs for pipeline '{}'",
        runs.len(),
        definition.name
    );

    Ok(Capability::Available(runs))
}
