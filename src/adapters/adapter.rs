use anyhow::Result;

use crate::model::{DisasterEvent, FeedKind, WeatherSample};

/// Canonical records produced from one raw payload.
///
/// `skipped_rows` counts entries the adapter could not normalize
/// (unparsable coordinates, missing identity); they are dropped
/// row-locally so the rest of the batch still lands.
#[derive(Debug, Default)]
pub struct AdapterBatch {
    pub events: Vec<DisasterEvent>,
    pub samples: Vec<WeatherSample>,
    pub skipped_rows: usize,
}

/// Translates one external payload into canonical records.
///
/// Implementations derive identities from the external system's own
/// identifiers (namespaced by source) so repeated fetches of the same
/// entity reconcile instead of duplicating.
pub trait FeedAdapter: Send + Sync {
    fn feed(&self) -> FeedKind;

    fn adapt(&self, raw: &[u8]) -> Result<AdapterBatch>;
}
