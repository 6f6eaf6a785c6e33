use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw status of a pipeline run as reported by the CI provider.
///
/// The provider reports lowercase statuses over the wire while the snapshot
/// format uses uppercase; parsing accepts any case. Statuses outside the
/// tracked set (skipped, manual, created, ...) collapse into `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    Success,
    Failed,
    Running,
    Canceled,
    #[default]
    Unknown,
}

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "RUNNING" => Self::Running,
            "CANCELED" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// The uppercase wire form used by the snapshot file. `Unknown` is the
    /// empty string, matching runs the provider never reported a status for.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Running => "RUNNING",
            Self::Canceled => "CANCELED",
            Self::Unknown => "",
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire_str())
    }
}

impl<'de> Deserialize<'de> for RunStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Classified outcome of a run, reduced to the three buckets the reports use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Success,
    Failed,
    Pending,
}

impl BuildOutcome {
    /// Classify a raw status string.
    ///
    /// Total function: exactly `"SUCCESS"` and `"FAILED"` map through,
    /// everything else (running, canceled, empty, unrecognized) is `Pending`.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl From<RunStatus> for BuildOutcome {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => Self::Success,
            RunStatus::Failed => Self::Failed,
            RunStatus::Running | RunStatus::Canceled | RunStatus::Unknown => Self::Pending,
        }
    }
}
