mod client;
mod enrich;
mod history;
mod repo_status;
mod types;

pub use client::GitLabClient;
pub use enrich::{detect_retries, enrich_runs};
pub use history::fetch_history;
pub use repo_status::{collect_repo_statuses, RepoTarget};
pub use types::{
    Commit, PipelineRun, RawJob, RepoBuildStatus, RetryInfo, TestReportSummary,
    DAY_BUCKET_SHIFT_HOURS,
};
