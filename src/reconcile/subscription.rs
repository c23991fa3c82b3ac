use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::FeedKind;

/// Collapses per-consumer interest in a feed onto at most one underlying
/// transport subscription.
///
/// Three widgets asking for the same feed engage the transport once;
/// subscribing twice from the same consumer is a no-op; only the departure
/// of the last interested consumer releases the transport.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    interests: HashMap<FeedKind, HashSet<String>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `consumer`'s interest in `feed`. Returns `true` when this
    /// is the first interest, i.e. the caller must engage the transport.
    pub fn subscribe(&mut self, feed: FeedKind, consumer: &str) -> bool {
        let consumers = self.interests.entry(feed).or_default();
        let was_empty = consumers.is_empty();
        if consumers.insert(consumer.to_string()) {
            debug!(%feed, consumer, total = consumers.len(), "consumer subscribed");
        }
        was_empty
    }

    /// Removes `consumer`'s interest in `feed`. Returns `true` when no
    /// interest remains and the transport subscription should be released.
    /// Unsubscribing a consumer that never subscribed changes nothing.
    pub fn unsubscribe(&mut self, feed: FeedKind, consumer: &str) -> bool {
        let Some(consumers) = self.interests.get_mut(&feed) else {
            return false;
        };
        if !consumers.remove(consumer) {
            return false;
        }
        debug!(%feed, consumer, remaining = consumers.len(), "consumer unsubscribed");
        if consumers.is_empty() {
            self.interests.remove(&feed);
            return true;
        }
        false
    }

    pub fn consumer_count(&self, feed: FeedKind) -> usize {
        self.interests.get(&feed).map_or(0, HashSet::len)
    }

    pub fn is_engaged(&self, feed: FeedKind) -> bool {
        self.consumer_count(feed) > 0
    }
}
