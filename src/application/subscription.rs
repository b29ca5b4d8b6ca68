// Source subscription - Scheduling side of one polled endpoint
use crate::domain::source::{Cadence, SourceKey};
use std::time::Duration;
use tokio::task::AbortHandle;

/// The request currently outstanding for a subscription.
#[derive(Debug)]
struct Pending {
    ticket: u64,
    abort: AbortHandle,
}

/// One mounted `{key, cadence}` entry.
///
/// At most one request is outstanding at a time. A completion is only
/// accepted if it carries the ticket of that request; anything else
/// belongs to a cancelled request and is dropped.
#[derive(Debug)]
pub struct Subscription {
    key: SourceKey,
    cadence: Cadence,
    timeout: Duration,
    pending: Option<Pending>,
}

impl Subscription {
    pub fn new(key: SourceKey, cadence: Cadence, timeout: Duration) -> Self {
        Self {
            key,
            cadence,
            timeout,
            pending: None,
        }
    }

    pub fn key(&self) -> SourceKey {
        self.key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_repeating(&self) -> bool {
        self.cadence.is_repeating()
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn track(&mut self, ticket: u64, abort: AbortHandle) {
        self.pending = Some(Pending { ticket, abort });
    }

    /// Accept the completion carrying `ticket`. Returns false for a stale one.
    pub fn complete(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Abort the outstanding request, if any. Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.abort.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
