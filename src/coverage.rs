use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coverage reading for one repository.
///
/// The badge service reports either a percentage or the literal token
/// `unknown`; failed lookups also land on `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageValue {
    Known(u32),
    Unknown,
}

impl CoverageValue {
    pub fn known(self) -> Option<u32> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }
}

impl Serialize for CoverageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => serializer.serialize_u32(*value),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for CoverageValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => Ok(n
                .as_u64()
                .map_or(Self::Unknown, |v| Self::Known(v as u32))),
            _ => Ok(Self::Unknown),
        }
    }
}

/// Mean of the known coverage values, rounded to the nearest integer.
///
/// Unknown readings are excluded from both sum and count. No known values
/// yields 0, not an error.
pub fn aggregate(values: &[CoverageValue]) -> u32 {
    let known: Vec<u32> = values.iter().filter_map(|v| v.known()).collect();
    if known.is_empty() {
        return 0;
    }

    let sum: u32 = known.iter().sum();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mean = (f64::from(sum) / known.len() as f64).round() as u32;
    mean
}
