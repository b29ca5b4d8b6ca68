// Snapshot aggregator - Sole owner of polled values and the reading history
use crate::application::error::FetchError;
use crate::domain::sample::{HistoryBuffer, Sample};
use crate::domain::snapshot::DashboardSnapshot;
use crate::domain::source::{SourceKey, SourcePayload, SourceState};
use crate::domain::stats::StatsSnapshot;
use crate::domain::status::{HealthStatus, ModeInfo, ServiceStatus};
use std::collections::BTreeMap;

pub fn clock_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Holds the last known value of every source.
///
/// Subscriptions and commands both feed results through [`apply`], so a
/// value has exactly one mutation path whoever fetched it.
///
/// [`apply`]: SnapshotAggregator::apply
#[derive(Debug)]
pub struct SnapshotAggregator {
    status: Option<ServiceStatus>,
    stats: Option<StatsSnapshot>,
    history: HistoryBuffer,
    data_updated: Option<String>,
    health: BTreeMap<SourceKey, HealthStatus>,
    mode: Option<ModeInfo>,
    sources: BTreeMap<SourceKey, SourceState>,
}

impl SnapshotAggregator {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            status: None,
            stats: None,
            history: HistoryBuffer::new(history_capacity),
            data_updated: None,
            health: BTreeMap::new(),
            mode: None,
            sources: BTreeMap::new(),
        }
    }

    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.stats.as_ref()
    }

    pub fn mode(&self) -> Option<&ModeInfo> {
        self.mode.as_ref()
    }

    /// Record the outcome of one fetch of `key`.
    ///
    /// Failures keep the previous value so the display is not blanked,
    /// but a held status or health payload is marked disconnected.
    /// In-flight flags are not tracked here; the controller derives them
    /// from its subscriptions when publishing.
    pub fn apply(&mut self, key: SourceKey, result: Result<SourcePayload, FetchError>) {
        let now = clock_label();
        let state = self.sources.entry(key).or_default();
        state.last_check = Some(now.clone());

        match result {
            Ok(payload) => {
                state.connected = true;
                state.message = payload_message(&payload);
                self.store(key, payload, now);
            }
            Err(err) => {
                state.connected = false;
                state.message = Some(err.user_message());
                tracing::warn!(source = %key, error = %err, "poll failed");
                self.mark_disconnected(key);
            }
        }
    }

    fn mark_disconnected(&mut self, key: SourceKey) {
        if key == SourceKey::Status {
            if let Some(status) = self.status.as_mut() {
                status.connected = false;
            }
        } else if let Some(health) = self.health.get_mut(&key) {
            health.connected = false;
        }
    }

    fn store(&mut self, key: SourceKey, payload: SourcePayload, now: String) {
        match payload {
            SourcePayload::Status(status) => self.status = Some(status),
            SourcePayload::Stats(stats) => self.stats = Some(stats),
            SourcePayload::Data(sample) => self.push_sample(sample, now),
            SourcePayload::Health(health) => {
                self.health.insert(key, health);
            }
            SourcePayload::Mode(mut info) => {
                if info.updated_at.is_none() {
                    info.updated_at = Some(now);
                }
                self.mode = Some(info);
            }
        }
    }

    fn push_sample(&mut self, sample: Sample, now: String) {
        self.history.push(sample);
        self.data_updated = Some(now);
    }

    /// Drop the reading history and the statistics after the backend
    /// cleared its window. Statistics read as unavailable until the next
    /// successful stats fetch.
    pub fn clear_window(&mut self) {
        self.history.clear();
        self.stats = None;
        self.data_updated = None;
    }

    pub fn fill(&self, snapshot: &mut DashboardSnapshot) {
        snapshot.status = self.status.clone();
        snapshot.stats = self.stats.clone();
        snapshot.latest = self.history.latest().cloned();
        snapshot.history = self.history.to_vec();
        snapshot.data_updated = self.data_updated.clone();
        snapshot.health = self.health.clone();
        snapshot.mode = self.mode.clone();
        snapshot.sources = self.sources.clone();
    }
}

fn payload_message(payload: &SourcePayload) -> Option<String> {
    match payload {
        SourcePayload::Status(status) => Some(status.message.clone()),
        SourcePayload::Health(health) => Some(health.message.clone()),
        SourcePayload::Mode(info) => Some(info.message.clone()),
        SourcePayload::Stats(_) | SourcePayload::Data(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::HISTORY_CAPACITY;
    use crate::domain::status::Mode;

    fn stats(count: u64) -> StatsSnapshot {
        StatsSnapshot {
            mean: Some(5.0),
            min: Some(1.0),
            max: Some(9.0),
            std_dev: None,
            count,
            last_updated: Some("12:00:01".to_string()),
        }
    }

    fn snapshot_of(aggregator: &SnapshotAggregator) -> DashboardSnapshot {
        let mut snapshot = DashboardSnapshot::default();
        aggregator.fill(&mut snapshot);
        snapshot
    }

    #[test]
    fn test_data_scenario() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(SourceKey::Data, Ok(SourcePayload::Data(Sample::new("s1", 10.0, "t1"))));
        assert_eq!(snapshot_of(&aggregator).history, vec![Sample::new("s1", 10.0, "t1")]);

        aggregator.apply(SourceKey::Data, Ok(SourcePayload::Data(Sample::new("s2", 20.0, "t2"))));
        let snapshot = snapshot_of(&aggregator);
        assert_eq!(
            snapshot.history,
            vec![Sample::new("s2", 20.0, "t2"), Sample::new("s1", 10.0, "t1")]
        );
        assert_eq!(snapshot.latest, Some(Sample::new("s2", 20.0, "t2")));
        assert!(snapshot.data_updated.is_some());
    }

    #[test]
    fn test_failed_stats_poll_keeps_values() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(SourceKey::Stats, Ok(SourcePayload::Stats(stats(40))));
        assert_eq!(aggregator.stats(), Some(&stats(40)));
        assert!(snapshot_of(&aggregator).source(SourceKey::Stats).unwrap().connected);

        aggregator.apply(
            SourceKey::Stats,
            Err(FetchError::Timeout(std::time::Duration::from_secs(2))),
        );
        assert_eq!(aggregator.stats(), Some(&stats(40)));

        let snapshot = snapshot_of(&aggregator);
        let state = snapshot.source(SourceKey::Stats).unwrap();
        assert!(!state.connected);
        assert!(!state.in_flight);
        assert!(state.message.is_some());
        assert!(state.last_check.is_some());
    }

    #[test]
    fn test_failed_status_keeps_serial_number() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        let status = ServiceStatus {
            connected: true,
            message: "Connected".to_string(),
            serial_number: "S/N: 1234567890".to_string(),
            last_check: "12:00:00".to_string(),
        };
        aggregator.apply(SourceKey::Status, Ok(SourcePayload::Status(status.clone())));
        aggregator.apply(
            SourceKey::Status,
            Err(FetchError::Transport("refused".to_string())),
        );

        let snapshot = snapshot_of(&aggregator);
        let held = snapshot.status.as_ref().unwrap();
        assert_eq!(held.serial_number, status.serial_number);
        assert!(!held.connected);
        let state = snapshot.source(SourceKey::Status).unwrap();
        assert!(!state.connected);
        assert_eq!(state.message.as_deref(), Some("Unable to reach microservice."));
    }

    #[test]
    fn test_recovers_on_next_success() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(
            SourceKey::Data,
            Err(FetchError::Transport("refused".to_string())),
        );
        assert!(!snapshot_of(&aggregator).source(SourceKey::Data).unwrap().connected);

        aggregator.apply(SourceKey::Data, Ok(SourcePayload::Data(Sample::new("01", 0.3, "t"))));
        let snapshot = snapshot_of(&aggregator);
        assert!(snapshot.source(SourceKey::Data).unwrap().connected);
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn test_clear_window_makes_stats_unavailable() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(SourceKey::Stats, Ok(SourcePayload::Stats(stats(40))));
        aggregator.apply(SourceKey::Data, Ok(SourcePayload::Data(Sample::new("01", 0.3, "t"))));

        aggregator.clear_window();
        let snapshot = snapshot_of(&aggregator);
        assert!(snapshot.stats.is_none());
        assert!(snapshot.history.is_empty());
        assert!(snapshot.latest.is_none());
    }

    #[test]
    fn test_mode_gets_a_timestamp() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(
            SourceKey::Mode,
            Ok(SourcePayload::Mode(ModeInfo {
                mode: Mode::Test,
                message: "test mode".to_string(),
                updated_at: None,
            })),
        );
        let mode = aggregator.mode().unwrap();
        assert_eq!(mode.mode, Mode::Test);
        assert!(mode.updated_at.is_some());
    }

    #[test]
    fn test_failed_health_check_marks_payload_disconnected() {
        let mut aggregator = SnapshotAggregator::new(HISTORY_CAPACITY);
        aggregator.apply(
            SourceKey::PlotHealth,
            Ok(SourcePayload::Health(HealthStatus {
                connected: true,
                message: "Plot service healthy.".to_string(),
            })),
        );
        aggregator.apply(
            SourceKey::PlotHealth,
            Err(FetchError::Timeout(std::time::Duration::from_secs(3))),
        );

        let snapshot = snapshot_of(&aggregator);
        let health = &snapshot.health[&SourceKey::PlotHealth];
        assert!(!health.connected);
        assert_eq!(health.message, "Plot service healthy.");
        assert!(!snapshot.source(SourceKey::PlotHealth).unwrap().connected);
    }
}
