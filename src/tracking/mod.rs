//! Sound-source tracking: angle conversion, candidate matching and the
//! shared lock state fed by the listeners and drained by the sender.

pub mod angles;
pub mod matcher;
pub mod state;

pub use angles::{direction_to_angles, Angles};
pub use matcher::{find_best_match, Match};
pub use state::{LockEvent, LockState, TrackingState};

use serde::{Deserialize, Deserializer};

/// One source entry from an ODAS report.
///
/// Candidate (SSL) entries carry no `id`; tracked (SST) entries do. Missing
/// or `null` numeric fields read as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub x: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub y: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub z: f64,
    #[serde(rename = "E", default, deserialize_with = "number_or_zero")]
    pub energy: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub activity: f64,
}

impl Source {
    /// Euclidean distance between the two direction vectors.
    pub fn distance_to(&self, other: &Source) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn angles(&self) -> Angles {
        direction_to_angles(self.x, self.y, self.z)
    }
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Which ODAS stream a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Potential sources: instantaneous energy peaks, no identity.
    Candidate,
    /// Tracked sources: stable ids with an activity score.
    Tracked,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate => write!(f, "candidate"),
            Self::Tracked => write!(f, "tracked"),
        }
    }
}

/// Body of one ODAS report: `{"timeStamp": .., "src": [..]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceReport {
    #[serde(default)]
    pub src: Option<Vec<Source>>,
}

impl SourceReport {
    /// Sources carried by the report, or `None` when `src` is absent or empty.
    pub fn into_sources(self) -> Option<Vec<Source>> {
        self.src.filter(|s| !s.is_empty())
    }
}
