// Snapshot domain model - The one consistent read handed to the presentation layer
use super::command::{CommandKind, CommandState};
use super::sample::Sample;
use super::source::{SourceKey, SourceState};
use super::stats::StatsSnapshot;
use super::status::{HealthStatus, ModeInfo, ServiceStatus};
use super::view::View;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSnapshot {
    /// Bumped on every publish.
    pub revision: u64,
    pub view: Option<View>,
    pub auto_stream: bool,
    pub status: Option<ServiceStatus>,
    /// `None` means unavailable: never fetched, or cleared by a reset
    /// whose refresh has not succeeded.
    pub stats: Option<StatsSnapshot>,
    pub latest: Option<Sample>,
    /// Newest first.
    pub history: Vec<Sample>,
    /// Local time of the last reading added to the history.
    pub data_updated: Option<String>,
    pub health: BTreeMap<SourceKey, HealthStatus>,
    pub mode: Option<ModeInfo>,
    pub sources: BTreeMap<SourceKey, SourceState>,
    pub commands: BTreeMap<CommandKind, CommandState>,
    /// Per command, whether its control is enabled right now.
    pub enabled: BTreeMap<CommandKind, bool>,
    pub reset_confirmation: ConfirmationState,
}

impl DashboardSnapshot {
    pub fn is_enabled(&self, kind: CommandKind) -> bool {
        self.enabled.get(&kind).copied().unwrap_or(false)
    }
}

#[cfg(test)]
impl DashboardSnapshot {
    pub fn sample_count(&self) -> u64 {
        crate::domain::stats::sample_count(self.stats.as_ref())
    }

    pub fn source(&self, key: SourceKey) -> Option<&SourceState> {
        self.sources.get(&key)
    }
}
