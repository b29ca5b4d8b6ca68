// Source domain models - Identity, cadence and tracked state of a polled endpoint
use super::sample::Sample;
use super::stats::StatsSnapshot;
use super::status::{HealthStatus, ModeInfo, ServiceStatus};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKey {
    Status,
    Stats,
    Data,
    AuthHealth,
    FeatureHealth,
    PlotHealth,
    ReportHealth,
    Mode,
}

impl SourceKey {
    pub const ALL: [SourceKey; 8] = [
        SourceKey::Status,
        SourceKey::Stats,
        SourceKey::Data,
        SourceKey::AuthHealth,
        SourceKey::FeatureHealth,
        SourceKey::PlotHealth,
        SourceKey::ReportHealth,
        SourceKey::Mode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Status => "status",
            SourceKey::Stats => "stats",
            SourceKey::Data => "data",
            SourceKey::AuthHealth => "auth-health",
            SourceKey::FeatureHealth => "feature-health",
            SourceKey::PlotHealth => "plot-health",
            SourceKey::ReportHealth => "report-health",
            SourceKey::Mode => "mode",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a subscription fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Repeats on every stream tick while auto-stream is on.
    Streaming,
    /// Fetches on mount and on explicit refresh only.
    OneShot,
}

impl Cadence {
    pub fn is_repeating(&self) -> bool {
        matches!(self, Cadence::Streaming)
    }
}

/// A successful, typed result of polling one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Status(ServiceStatus),
    Stats(StatsSnapshot),
    Data(Sample),
    Health(HealthStatus),
    Mode(ModeInfo),
}

/// Tracked connectivity of one source as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SourceState {
    pub connected: bool,
    pub in_flight: bool,
    pub message: Option<String>,
    pub last_check: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip_names() {
        for key in SourceKey::ALL {
            assert_eq!(SourceKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SourceKey::parse("nope"), None);
    }
}
