//! Push-channel boundary and the orchestrator that routes everything.
//!
//! The transport itself (socket, poller) lives outside this crate; it
//! delivers [`TransportEvent`]s in per-feed arrival order. The
//! [`Pipeline`] owns the per-type stores, feeds the health monitor, and is
//! the one place that couples the scoring engine to the predictions store.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::adapters::AdapterBatch;
use crate::health::HealthMonitor;
use crate::model::{DisasterEvent, FeedKind, Prediction, SensorReading, WeatherSample};
use crate::predict;
use crate::reconcile::{FeedStore, SubscriptionManager};

/// Named events the push channel can deliver.
#[derive(Debug)]
pub enum TransportEvent {
    NewEvent(DisasterEvent),
    EventsUpdate(Vec<DisasterEvent>),
    NewPrediction(Prediction),
    PredictionsUpdate(Vec<Prediction>),
    SensorUpdate(SensorReading),
    Connect,
    Disconnect,
}

/// Context window for the seismic heuristic: events newer than this do not
/// count as "recent".
const RECENT_EVENT_WINDOW_DAYS: i64 = 7;

/// Owns one store per record type plus the health monitor. All mutation of
/// the collections flows through here, on whichever single task drives the
/// event loop.
pub struct Pipeline {
    pub events: FeedStore<DisasterEvent>,
    pub predictions: FeedStore<Prediction>,
    pub sensors: FeedStore<SensorReading>,
    pub health: HealthMonitor,
    pub subscriptions: SubscriptionManager,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            events: FeedStore::new(),
            predictions: FeedStore::new(),
            sensors: FeedStore::new(),
            health: HealthMonitor::new(),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Routes one push-channel event into the stores and health monitor.
    pub fn dispatch(&mut self, event: TransportEvent) {
        let now = Utc::now();
        match event {
            TransportEvent::NewEvent(record) => {
                if let Some(feed) = feed_of(&record) {
                    self.health.record_publish(feed, now);
                }
                self.events.apply_single(record);
            }
            TransportEvent::EventsUpdate(records) => {
                debug!(count = records.len(), "bulk events update");
                // An authoritative refresh is feed activity for every feed
                // represented in the batch.
                for feed in records.iter().filter_map(feed_of) {
                    self.health.record_publish(feed, now);
                }
                self.events.apply_bulk(records);
            }
            TransportEvent::NewPrediction(record) => {
                self.health.record_publish(FeedKind::Predictions, now);
                self.predictions.apply_single(record);
            }
            TransportEvent::PredictionsUpdate(records) => {
                self.health.record_publish(FeedKind::Predictions, now);
                self.predictions.apply_bulk(records);
            }
            TransportEvent::SensorUpdate(record) => {
                self.sensors.apply_single(record);
            }
            TransportEvent::Connect => self.health.on_connect(),
            TransportEvent::Disconnect => self.health.on_disconnect(),
        }
    }

    /// Merges one adapter batch from `feed` and scores any weather samples
    /// it carried. Returns `(events_merged, predictions_emitted)`.
    ///
    /// Events merge one at a time — a fetch of one source is authoritative
    /// for that source only, never for the whole events collection.
    pub fn ingest_batch(&mut self, feed: FeedKind, batch: AdapterBatch) -> (usize, usize) {
        let now = Utc::now();
        let events_merged = batch.events.len();

        for event in batch.events {
            self.events.apply_single(event);
        }
        if events_merged > 0 {
            self.health.record_publish(feed, now);
        }

        let mut predictions_emitted = 0;
        for sample in &batch.samples {
            predictions_emitted += self.score_sample(sample, now);
        }
        if !batch.samples.is_empty() {
            self.health.record_publish(feed, now);
        }

        (events_merged, predictions_emitted)
    }

    /// Runs the scoring engine over one sample with recent-event context
    /// and merges whatever it emits. Returns the number of predictions.
    pub fn score_sample(&mut self, sample: &WeatherSample, now: DateTime<Utc>) -> usize {
        let snapshot = self.events.snapshot();
        let cutoff = now - Duration::days(RECENT_EVENT_WINDOW_DAYS);
        let context: Vec<DisasterEvent> = snapshot
            .iter()
            .filter(|e| e.created_at >= cutoff)
            .cloned()
            .collect();

        let emitted = predict::evaluate(sample, &context, now);
        let count = emitted.len();
        for prediction in emitted {
            info!(
                kind = %prediction.prediction_type,
                probability = prediction.probability,
                severity = prediction.severity_level.as_str(),
                "prediction emitted"
            );
            self.predictions.apply_single(prediction);
        }
        if count > 0 {
            self.health.record_publish(FeedKind::Predictions, now);
        }
        count
    }

    /// Flips `is_active` on predictions past their validity window.
    /// Returns how many aged out.
    pub fn age_predictions(&mut self, now: DateTime<Utc>) -> usize {
        let snapshot = self.predictions.snapshot();
        let aged = predict::age_out(&snapshot, now);
        let count = aged.len();
        for prediction in aged {
            self.predictions.apply_single(prediction);
        }
        count
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an event back to the feed that produced it, for freshness tracking.
fn feed_of(event: &DisasterEvent) -> Option<FeedKind> {
    match event.source.as_str() {
        "USGS" => Some(FeedKind::Seismic),
        "FIRMS" => Some(FeedKind::Wildfire),
        "OpenFEMA" => Some(FeedKind::Declarations),
        _ => None,
    }
}
