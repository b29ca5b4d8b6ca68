// Sample domain model - Readings from the streaming data source
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on the readings kept in the history ring.
pub const HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub sensor_id: String,
    pub value: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

#[cfg(test)]
impl Sample {
    pub fn new(sensor_id: impl Into<String>, value: f64, timestamp: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            timestamp: timestamp.into(),
            sequence: None,
        }
    }
}

/// Newest-first ring of readings.
///
/// Recency is insertion order: a reading that arrives late is still the
/// newest entry, it is never resequenced by its timestamp.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    /// `capacity` is clamped to `1..=HISTORY_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, HISTORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.entries.push_front(sample);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.entries.front()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
