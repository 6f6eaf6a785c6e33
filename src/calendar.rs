use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::providers::gitlab::PipelineRun;

/// Runs that landed on one calendar day, keyed by pipeline name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub runs: IndexMap<String, PipelineRun>,
}

/// Fold per-pipeline run lists into a per-day view of the trailing window.
///
/// Index 0 of the window is `today`, the last index is `window_days - 1`
/// days ago. A day holds, per pipeline, the run whose shifted date falls on
/// it; run lists are newest-first, so the first match wins when a pipeline
/// ran twice on one day. Days with no runs across all pipelines are filtered
/// out.
pub fn merge_by_day(
    series: &[(String, Vec<PipelineRun>)],
    today: NaiveDate,
    window_days: u32,
) -> Vec<CalendarDay> {
    let mut days = Vec::new();

    for offset in 0..window_days {
        let date = today - Duration::days(i64::from(offset));
        let mut runs = IndexMap::new();

        for (name, pipeline_runs) in series {
            if let Some(run) = pipeline_runs.iter().find(|run| run.shifted_date == date) {
                runs.insert(name.clone(), run.clone());
            }
        }

        if !runs.is_empty() {
            days.push(CalendarDay { date, runs });
        }
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gitlab::{RetryInfo, TestReportSummary};
    use crate::status::RunStatus;

    fn run(id: u64, shifted_date: &str) -> PipelineRun {
        PipelineRun {
            id,
            started_at: "2026-08-06T22:00:00Z".parse().unwrap(),
            path: format!("/acme/widget-qa/-/pipelines/{id}"),
            status: RunStatus::Success,
            shifted_date: shifted_date.parse().unwrap(),
            test_report_summary: TestReportSummary::default(),
            retries: RetryInfo::default(),
        }
    }

    fn today() -> NaiveDate {
        "2026-08-07".parse().unwrap()
    }

    #[test]
    fn empty_days_never_appear_in_the_output() {
        let series = vec![(
            "widget-nightly".to_string(),
            vec![run(2, "2026-08-07"), run(1, "2026-08-05")],
        )];

        let days = merge_by_day(&series, today(), 7);

        let dates: Vec<String> = days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-08-07", "2026-08-05"]);
    }

    #[test]
    fn a_day_with_one_pipeline_gets_a_single_entry_map() {
        let series = vec![
            ("widget-nightly".to_string(), vec![run(1, "2026-08-06")]),
            ("gadget-nightly".to_string(), vec![]),
        ];

        let days = merge_by_day(&series, today(), 7);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].runs.len(), 1);
        assert!(days[0].runs.contains_key("widget-nightly"));
    }

    #[test]
    fn pipelines_sharing_a_day_land_in_the_same_entry() {
        let series = vec![
            ("widget-nightly".to_string(), vec![run(1, "2026-08-06")]),
            ("gadget-nightly".to_string(), vec![run(2, "2026-08-06")]),
        ];

        let days = merge_by_day(&series, today(), 7);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].runs.len(), 2);
        assert_eq!(days[0].runs["widget-nightly"].id, 1);
        assert_eq!(days[0].runs["gadget-nightly"].id, 2);
    }

    #[test]
    fn first_match_wins_when_a_pipeline_ran_twice_on_one_day() {
        // Newest-first list: run 9 is the later execution
        let series = vec![(
            "widget-nightly".to_string(),
            vec![run(9, "2026-08-06"), run(8, "2026-08-06")],
        )];

        let days = merge_by_day(&series, today(), 7);

        assert_eq!(days[0].runs["widget-nightly"].id, 9);
    }

    #[test]
    fn runs_outside_the_window_are_ignored() {
        let series = vec![(
            "widget-nightly".to_string(),
            vec![run(1, "2026-07-01")],
        )];

        let days = merge_by_day(&series, today(), 7);
        assert!(days.is_empty());
    }
}
