use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use super::adapter::{AdapterBatch, FeedAdapter};
use crate::model::{
    Coordinates, DisasterEvent, EventKind, EventStatus, FeedKind, Severity,
};

/// Normalizes the NASA FIRMS active-fire CSV feed.
///
/// FIRMS has no per-detection id, so identity is derived from the
/// detection's position and acquisition time — the fields that make a
/// detection unique and that repeat unchanged on refetch.
pub struct WildfireAdapter;

#[derive(Debug, Deserialize)]
struct FirmsRow {
    latitude: f64,
    longitude: f64,
    acq_date: String,
    acq_time: String,
    confidence: f64,
    frp: f64,
}

/// Detection-confidence ladder: >= 80 critical, >= 50 high, else moderate.
pub(crate) fn classify_confidence(confidence: f64) -> Severity {
    if confidence >= 80.0 {
        Severity::Critical
    } else if confidence >= 50.0 {
        Severity::High
    } else {
        Severity::Moderate
    }
}

impl FeedAdapter for WildfireAdapter {
    fn feed(&self) -> FeedKind {
        FeedKind::Wildfire
    }

    fn adapt(&self, raw: &[u8]) -> Result<AdapterBatch> {
        let mut reader = csv::Reader::from_reader(raw);
        let mut batch = AdapterBatch::default();
        let now = Utc::now();

        for row in reader.deserialize::<FirmsRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    debug!(error = %e, "wildfire row skipped: unparsable");
                    batch.skipped_rows += 1;
                    continue;
                }
            };

            let Some(coordinates) = Coordinates::new(row.latitude, row.longitude) else {
                debug!(
                    lat = row.latitude,
                    lng = row.longitude,
                    "wildfire row skipped: coordinates out of range"
                );
                batch.skipped_rows += 1;
                continue;
            };

            // acq_time is zero-padded HHMM
            let detected_at = NaiveDate::parse_from_str(&row.acq_date, "%Y-%m-%d")
                .ok()
                .zip(NaiveTime::parse_from_str(&format!("{:0>4}", row.acq_time), "%H%M").ok())
                .map(|(date, time)| Utc.from_utc_datetime(&date.and_time(time)));
            let Some(detected_at) = detected_at else {
                debug!(
                    acq_date = %row.acq_date,
                    acq_time = %row.acq_time,
                    "wildfire row skipped: unparsable acquisition timestamp"
                );
                batch.skipped_rows += 1;
                continue;
            };

            let confidence = row.confidence;
            batch.events.push(DisasterEvent {
                id: format!(
                    "firms-{:.4}-{:.4}-{}-{:0>4}",
                    row.latitude, row.longitude, row.acq_date, row.acq_time
                ),
                name: "Active wildfire detected".to_string(),
                event_type: EventKind::Wildfire,
                location: format!("Lat: {:.2}, Lon: {:.2}", row.latitude, row.longitude),
                coordinates,
                severity: classify_confidence(confidence),
                status: EventStatus::Active,
                magnitude: Some(format!("FRP: {:.1}", row.frp)),
                estimated_affected_population: Some((confidence * 100.0) as u64),
                estimated_economic_impact_usd: Some((confidence * 1_000_000.0) as u64),
                description: format!(
                    "Active wildfire detected with {confidence}% confidence, radiative power {:.1} MW",
                    row.frp
                ),
                source: "FIRMS".to_string(),
                created_at: detected_at,
                updated_at: detected_at.max(now),
            });
        }

        Ok(batch)
    }
}
