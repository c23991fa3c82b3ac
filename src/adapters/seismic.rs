use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::adapter::{AdapterBatch, FeedAdapter};
use crate::model::{
    Coordinates, DisasterEvent, EventKind, EventStatus, FeedKind, Severity,
};

/// Normalizes the USGS earthquake GeoJSON summary feed.
///
/// Identity is `usgs-<feature id>`, stable across fetches of the same
/// quake. Affected-population and economic-impact figures are exponential
/// estimates keyed off magnitude, not measured values.
pub struct SeismicAdapter;

/// Magnitude-to-severity ladder. Monotonic in magnitude by construction:
/// >= 7.0 critical, >= 5.5 high, below that moderate.
pub(crate) fn classify_magnitude(magnitude: f64) -> Severity {
    if magnitude >= 7.0 {
        Severity::Critical
    } else if magnitude >= 5.5 {
        Severity::High
    } else {
        Severity::Moderate
    }
}

fn estimate_affected(magnitude: f64) -> u64 {
    (10f64.powf(magnitude) * 100.0) as u64
}

fn estimate_impact_usd(magnitude: f64) -> u64 {
    (10f64.powf(magnitude) * 1_000_000.0) as u64
}

impl FeedAdapter for SeismicAdapter {
    fn feed(&self) -> FeedKind {
        FeedKind::Seismic
    }

    fn adapt(&self, raw: &[u8]) -> Result<AdapterBatch> {
        let json: serde_json::Value = serde_json::from_slice(raw)?;
        let features = json["features"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut batch = AdapterBatch::default();
        let now = Utc::now();

        for feature in &features {
            let props = &feature["properties"];

            let Some(external_id) = feature["id"].as_str().filter(|s| !s.is_empty()) else {
                batch.skipped_rows += 1;
                continue;
            };
            let Some(magnitude) = props["mag"].as_f64() else {
                debug!(external_id, "seismic row skipped: missing magnitude");
                batch.skipped_rows += 1;
                continue;
            };
            let coords = feature["geometry"]["coordinates"].as_array();
            let coordinates = coords
                .and_then(|c| Coordinates::new(c.get(1)?.as_f64()?, c.get(0)?.as_f64()?));
            let Some(coordinates) = coordinates else {
                debug!(external_id, "seismic row skipped: unparsable coordinates");
                batch.skipped_rows += 1;
                continue;
            };

            let place = props["place"].as_str().unwrap_or("Unknown location");
            let occurred_at = props["time"]
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or(now);

            batch.events.push(DisasterEvent {
                id: format!("usgs-{external_id}"),
                name: props["title"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("M{magnitude:.1} earthquake")),
                event_type: EventKind::Earthquake,
                location: place.to_string(),
                coordinates,
                severity: classify_magnitude(magnitude),
                status: EventStatus::Active,
                magnitude: Some(magnitude.to_string()),
                estimated_affected_population: Some(estimate_affected(magnitude)),
                estimated_economic_impact_usd: Some(estimate_impact_usd(magnitude)),
                description: format!("Magnitude {magnitude} earthquake {place}"),
                source: "USGS".to_string(),
                created_at: occurred_at,
                updated_at: occurred_at.max(now),
            });
        }

        Ok(batch)
    }
}
