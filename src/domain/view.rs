// View domain model - Which sources a mounted view keeps fresh
use super::source::{Cadence, SourceKey};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Statistics,
    SystemStatus,
    Services,
}

impl View {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "dashboard" => Some(View::Dashboard),
            "statistics" => Some(View::Statistics),
            "system-status" | "status" => Some(View::SystemStatus),
            "services" => Some(View::Services),
            _ => None,
        }
    }

    /// Subscription table of the view. Streaming sources share the
    /// controller's stream ticker.
    pub fn subscriptions(&self) -> Vec<(SourceKey, Cadence)> {
        let streaming = Cadence::Streaming;
        match self {
            View::Dashboard => vec![
                (SourceKey::Status, streaming),
                (SourceKey::Stats, streaming),
                (SourceKey::Data, streaming),
            ],
            View::Statistics => vec![
                (SourceKey::Stats, Cadence::OneShot),
                (SourceKey::Status, Cadence::OneShot),
            ],
            View::SystemStatus => vec![(SourceKey::Status, Cadence::OneShot)],
            View::Services => vec![
                (SourceKey::AuthHealth, Cadence::OneShot),
                (SourceKey::FeatureHealth, Cadence::OneShot),
                (SourceKey::PlotHealth, Cadence::OneShot),
                (SourceKey::ReportHealth, Cadence::OneShot),
                (SourceKey::Mode, Cadence::OneShot),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_streams_the_triad() {
        let table = View::Dashboard.subscriptions();
        let keys: Vec<SourceKey> = table.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![SourceKey::Status, SourceKey::Stats, SourceKey::Data]);
        assert!(table.iter().all(|(_, c)| *c == Cadence::Streaming));
    }

    #[test]
    fn test_health_checks_are_one_shot() {
        let table = View::Services.subscriptions();
        assert_eq!(table.len(), 5);
        assert!(table.iter().all(|(_, c)| !c.is_repeating()));
    }
}
