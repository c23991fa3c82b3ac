//! Connectivity and freshness observation.
//!
//! The monitor records what it is told — successful publishes per feed and
//! transport connect/disconnect notifications — and answers pull-based
//! queries. It never retries or reconnects; that is the transport's job.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::model::FeedKind;

#[derive(Debug)]
pub struct HealthMonitor {
    connected: bool,
    last_update: HashMap<FeedKind, DateTime<Utc>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            connected: false,
            last_update: HashMap::new(),
        }
    }

    /// Called by the orchestrator on every successful publish for `feed`.
    pub fn record_publish(&mut self, feed: FeedKind, at: DateTime<Utc>) {
        self.last_update.insert(feed, at);
    }

    pub fn on_connect(&mut self) {
        if !self.connected {
            info!("transport connected");
        }
        self.connected = true;
    }

    pub fn on_disconnect(&mut self) {
        if self.connected {
            info!("transport disconnected");
        }
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// A feed is healthy while the transport is connected and the feed has
    /// published within `max_age` of `now`. No fetch is triggered to find
    /// out.
    pub fn is_healthy(&self, feed: FeedKind, max_age: Duration, now: DateTime<Utc>) -> bool {
        if !self.connected {
            return false;
        }
        match self.last_update.get(&feed) {
            Some(at) => now - *at <= max_age,
            None => false,
        }
    }

    pub fn last_update(&self, feed: FeedKind) -> Option<DateTime<Utc>> {
        self.last_update.get(&feed).copied()
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}
