use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::RunStatus;

/// Hours added to a run's creation time before bucketing it into a calendar
/// day. Late-night and early-morning runs of the same nightly land on one
/// logical day.
pub const DAY_BUCKET_SHIFT_HOURS: i64 = 12;

/// One execution of a tracked pipeline schedule.
///
/// Created by the history fetcher from the raw listing record; the enricher
/// fills in the test summary and retry metadata. Not mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: u64,
    pub started_at: DateTime<Utc>,
    /// Web path of the run, relative to the instance base URL
    pub path: String,
    pub status: RunStatus,
    /// Day bucket, derived once from `started_at` plus the fixed shift
    pub shifted_date: NaiveDate,
    #[serde(default)]
    pub test_report_summary: TestReportSummary,
    #[serde(default)]
    pub retries: RetryInfo,
}

impl PipelineRun {
    /// Build a run from a raw listing record.
    ///
    /// `shifted_date` is computed here and never recomputed.
    pub fn from_raw(raw: RawPipeline, base_url: &str) -> Self {
        let shifted_date = (raw.created_at + Duration::hours(DAY_BUCKET_SHIFT_HOURS)).date_naive();
        let path = raw
            .web_url
            .strip_prefix(base_url)
            .unwrap_or(&raw.web_url)
            .to_string();

        Self {
            id: raw.id,
            started_at: raw.created_at,
            path,
            status: RunStatus::parse(&raw.status),
            shifted_date,
            test_report_summary: TestReportSummary::default(),
            retries: RetryInfo::default(),
        }
    }
}

/// Test totals for one run. Zeroed when enrichment fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReportSummary {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub error: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub success: u64,
}

/// Retry metadata for one run, derived from its job list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInfo {
    #[serde(default)]
    pub has_retries: bool,
    #[serde(default)]
    pub retried_job_count: usize,
}

/// Triggering commit of a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
}

/// Latest build outcome snapshot for one tracked repository.
///
/// Overwritten wholesale on each aggregation pass. The default value stands
/// in for repositories whose lookup failed; its empty status classifies as
/// pending downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoBuildStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub pipeline_id: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub commit: Commit,
    /// Web path of the first failed job, empty when none
    #[serde(default)]
    pub failed_job: String,
}

/// Raw pipeline record from the run-listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipeline {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub sha: Option<String>,
}

/// Raw job record from the per-pipeline jobs endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Wire shape of the test report summary endpoint.
#[derive(Debug, Deserialize)]
pub struct TestReportSummaryResponse {
    pub total: TestReportSummary,
}

/// Wire shape of the commit detail endpoint.
#[derive(Debug, Deserialize)]
pub struct RawCommitDetail {
    pub id: String,
    #[serde(default)]
    pub author_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(created_at: &str) -> RawPipeline {
        RawPipeline {
            id: 42,
            created_at: created_at.parse().unwrap(),
            status: "success".to_string(),
            web_url: "https://gitlab.com/acme/widget-qa/-/pipelines/42".to_string(),
            sha: None,
        }
    }

    #[test]
    fn shifted_date_buckets_late_night_runs_into_next_day() {
        let run = PipelineRun::from_raw(raw("2026-08-06T23:30:00Z"), "https://gitlab.com");
        assert_eq!(run.shifted_date, "2026-08-07".parse().unwrap());
    }

    #[test]
    fn shifted_date_keeps_morning_runs_on_their_day() {
        let run = PipelineRun::from_raw(raw("2026-08-07T03:00:00Z"), "https://gitlab.com");
        assert_eq!(run.shifted_date, "2026-08-07".parse().unwrap());
    }

    #[test]
    fn web_path_is_relative_to_the_instance() {
        let run = PipelineRun::from_raw(raw("2026-08-07T03:00:00Z"), "https://gitlab.com");
        assert_eq!(run.path, "/acme/widget-qa/-/pipelines/42");
    }

    #[test]
    fn foreign_web_url_is_kept_verbatim() {
        let mut record = raw("2026-08-07T03:00:00Z");
        record.web_url = "https://other.example.com/x".to_string();
        let run = PipelineRun::from_raw(record, "https://gitlab.com");
        assert_eq!(run.path, "https://other.example.com/x");
    }

    #[test]
    fn run_serializes_with_camel_case_keys() {
        let run = PipelineRun::from_raw(raw("2026-08-07T03:00:00Z"), "https://gitlab.com");
        let json = serde_json::to_value(&run).unwrap();
        assert!(json.get("startedAt").is_some());
        assert!(json.get("shiftedDate").is_some());
        assert!(json.get("testReportSummary").is_some());
        assert_eq!(json["status"], "SUCCESS");
    }

    #[test]
    fn default_build_status_classifies_as_pending() {
        use crate::status::BuildOutcome;

        let status = RepoBuildStatus::default();
        assert_eq!(BuildOutcome::from(status.status), BuildOutcome::Pending);
        assert_eq!(serde_json::to_value(&status).unwrap()["status"], "");
    }
}
