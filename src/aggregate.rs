use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::coverage::{self, CoverageValue};
use crate::error::Result;
use crate::providers::gitlab::RepoBuildStatus;
use crate::status::BuildOutcome;

/// Area a repository reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Nightlies,
    Backend,
    Client,
    Docs,
    Qa,
    Saas,
}

impl Area {
    /// Reporting order of the areas.
    pub const ALL: [Area; 6] = [
        Area::Nightlies,
        Area::Backend,
        Area::Client,
        Area::Docs,
        Area::Qa,
        Area::Saas,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Area::Nightlies => "nightlies",
            Area::Backend => "backend",
            Area::Client => "client",
            Area::Docs => "docs",
            Area::Qa => "qa",
            Area::Saas => "saas",
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key the overall coverage is written under in the snapshot.
pub const TOTAL_KEY: &str = "total";

/// One tracked repository inside the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEntry {
    pub repo: String,
    pub branch: String,
    pub area: Area,
    #[serde(default)]
    pub build_status: RepoBuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependabot_pendings: Option<u64>,
}

impl RepoEntry {
    pub fn outcome(&self) -> BuildOutcome {
        BuildOutcome::from(self.build_status.status)
    }
}

/// Outcome counts for one area. Always sums to the area's member count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
}

/// One area's slice of the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaAggregate {
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
    #[serde(default)]
    pub coverage: u32,
}

impl AreaAggregate {
    /// Classify every member. Total by construction: each repo lands in
    /// exactly one bucket, so the counts sum to the member count.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in &self.repos {
            match entry.outcome() {
                BuildOutcome::Success => counts.success += 1,
                BuildOutcome::Failed => counts.failed += 1,
                BuildOutcome::Pending => counts.pending += 1,
            }
        }
        counts
    }
}

/// Per-pass aggregation result, keyed by area name plus a `total` entry
/// carrying the overall coverage. Written once per pass and consumed by the
/// dashboard and the notification path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub IndexMap<String, AreaAggregate>);

impl Snapshot {
    /// Fold independently gathered repo entries into area aggregates.
    ///
    /// Runs single-threaded after all concurrent lookups have been joined.
    /// Duplicate (repository, branch) mappings keep the first entry seen;
    /// later ones are discarded with a warning. Areas with no members are
    /// omitted.
    pub fn build(entries: Vec<RepoEntry>) -> Self {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut by_area: IndexMap<String, AreaAggregate> = Area::ALL
            .iter()
            .map(|area| (area.as_str().to_string(), AreaAggregate::default()))
            .collect();

        for entry in entries {
            if !seen.insert((entry.repo.clone(), entry.branch.clone())) {
                warn!(
                    "Duplicate mapping for {}@{}; keeping the first entry",
                    entry.repo, entry.branch
                );
                continue;
            }
            by_area
                .entry(entry.area.as_str().to_string())
                .or_default()
                .repos
                .push(entry);
        }

        by_area.retain(|_, aggregate| !aggregate.repos.is_empty());

        let mut all_values: Vec<CoverageValue> = Vec::new();
        for aggregate in by_area.values_mut() {
            let values: Vec<CoverageValue> = aggregate
                .repos
                .iter()
                .filter_map(|entry| entry.coverage)
                .collect();
            all_values.extend(values.iter().copied());
            aggregate.coverage = coverage::aggregate(&values);
        }

        by_area.insert(
            TOTAL_KEY.to_string(),
            AreaAggregate {
                repos: Vec::new(),
                coverage: coverage::aggregate(&all_values),
            },
        );

        Self(by_area)
    }

    /// Area aggregates in reporting order, skipping the `total` entry.
    pub fn areas(&self) -> impl Iterator<Item = (&str, &AreaAggregate)> {
        self.0
            .iter()
            .filter(|(name, _)| name.as_str() != TOTAL_KEY)
            .map(|(name, aggregate)| (name.as_str(), aggregate))
    }

    pub fn total_coverage(&self) -> u32 {
        self.0
            .get(TOTAL_KEY)
            .map(|aggregate| aggregate.coverage)
            .unwrap_or(0)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        info!("Snapshot written to: {}", path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
