//! Per-tag delivery throttle
//!
//! Limits each report kind to one delivered record per interval, measured on
//! the events' receive timestamps so that replayed streams throttle the same
//! way live ones do.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::schema::ReportTag;

#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_delivery: HashMap<ReportTag, DateTime<Utc>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_delivery: HashMap::new(),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::milliseconds(millis.min(i64::MAX as u64) as i64))
    }

    /// Record a delivery attempt for `tag` at `at`.
    ///
    /// Returns `false` when the previous delivery for this tag was less than
    /// the interval ago. A timestamp earlier than the last delivery (clock
    /// step, out-of-order replay) is admitted and restarts the window.
    pub fn admit(&mut self, tag: ReportTag, at: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_delivery.get(&tag) {
            let elapsed = at - *last;
            if elapsed >= Duration::zero() && elapsed < self.min_interval {
                return false;
            }
        }
        self.last_delivery.insert(tag, at);
        true
    }

    /// Forget all delivery history
    pub fn clear(&mut self) {
        self.last_delivery.clear();
    }
}
