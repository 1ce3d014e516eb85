// src/storage/counter.rs

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::storage::{window_cutoff, RequestRecord};

/// Timestamped request events for one scope.
///
/// Records are expected in non-decreasing timestamp order, so pruning only
/// ever pops from the front.
#[derive(Debug, Clone)]
pub struct SlidingWindowCounter {
    window: Duration,
    records: VecDeque<RequestRecord>,
}

impl SlidingWindowCounter {
    /// Creates an empty counter. A zero-length window is a configuration error.
    pub fn new(window: Duration) -> Result<Self> {
        if window.is_zero() {
            return Err(GatewayError::Config(
                "sliding window duration must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            window,
            records: VecDeque::new(),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Removes every record with `timestamp <= now - window`.
    pub fn prune(&mut self, now_ms: u64) {
        let Some(cutoff) = window_cutoff(now_ms, self.window) else {
            return;
        };

        while self
            .records
            .front()
            .is_some_and(|record| record.timestamp_ms <= cutoff)
        {
            self.records.pop_front();
        }
    }

    pub fn count(&mut self, now_ms: u64) -> u64 {
        self.prune(now_ms);
        self.records.len() as u64
    }

    /// Appends one event. Admission is decided by the caller.
    pub fn record(&mut self, record: RequestRecord) {
        // Keep the deque ordered even if a clock steps backwards
        if self
            .records
            .back()
            .is_some_and(|last| last.timestamp_ms > record.timestamp_ms)
        {
            let at = self
                .records
                .partition_point(|r| r.timestamp_ms <= record.timestamp_ms);
            self.records.insert(at, record);
        } else {
            self.records.push_back(record);
        }
    }

    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.records.front().map(|record| record.timestamp_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
