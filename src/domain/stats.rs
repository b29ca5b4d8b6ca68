// Statistics domain model - Rolling window summary computed by the backend
use serde::{Deserialize, Serialize};

/// Minimum number of buffered samples before sample-dependent actions unlock.
pub const SAMPLE_THRESHOLD: u64 = 30;

/// Summary of the backend's rolling window.
///
/// Values are passed through as received. `mean`, `min`, `max` and
/// `std_dev` are null while the window is empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default, alias = "stddev")]
    pub std_dev: Option<f64>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl StatsSnapshot {
    pub fn meets_threshold(&self) -> bool {
        self.count >= SAMPLE_THRESHOLD
    }
}

/// Sample count of an optional snapshot, zero when none is held.
pub fn sample_count(stats: Option<&StatsSnapshot>) -> u64 {
    stats.map(|s| s.count).unwrap_or(0)
}
