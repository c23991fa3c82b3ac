use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::adapter::{AdapterBatch, FeedAdapter};
use crate::model::{
    Coordinates, DisasterEvent, EventKind, EventStatus, FeedKind, Severity,
};

/// Normalizes OpenFEMA disaster declaration summaries.
///
/// Identity is `fema-<disasterNumber>` — FEMA's own declaration number, so
/// a declaration seen on every refresh reconciles into one record.
pub struct DeclarationsAdapter;

/// Declaration-type ladder: DR (major disaster) high, EM (emergency)
/// moderate, FM (fire management assistance) low.
pub(crate) fn classify_declaration(declaration_type: &str) -> Severity {
    match declaration_type {
        "DR" => Severity::High,
        "EM" => Severity::Moderate,
        _ => Severity::Low,
    }
}

fn map_incident_type(incident_type: &str) -> EventKind {
    let lowered = incident_type.to_lowercase();
    if lowered.contains("hurricane") {
        EventKind::Hurricane
    } else if lowered.contains("flood") {
        EventKind::Flood
    } else if lowered.contains("fire") {
        EventKind::Wildfire
    } else if lowered.contains("earthquake") {
        EventKind::Earthquake
    } else if lowered.contains("tornado") {
        EventKind::Tornado
    } else if lowered.contains("volcan") {
        EventKind::Volcano
    } else if lowered.contains("drought") {
        EventKind::Drought
    } else if lowered.contains("storm") {
        EventKind::Storm
    } else {
        EventKind::Other
    }
}

/// Approximate state centroids for the states FEMA declarations most often
/// cover; declarations carry no coordinates of their own.
fn state_centroid(fips: &str) -> Option<Coordinates> {
    let (lat, lng) = match fips {
        "06" => (36.7783, -119.4179), // California
        "12" => (27.6648, -81.5158),  // Florida
        "48" => (31.9686, -99.9018),  // Texas
        "36" => (42.1657, -74.9481),  // New York
        "22" => (30.9843, -91.9623),  // Louisiana
        "28" => (32.7416, -89.6787),  // Mississippi
        "01" => (32.3182, -86.9023),  // Alabama
        "13" => (32.1656, -82.9001),  // Georgia
        "45" => (33.8569, -80.9450),  // South Carolina
        "37" => (35.7596, -79.0193),  // North Carolina
        _ => return None,
    };
    Coordinates::new(lat, lng)
}

impl FeedAdapter for DeclarationsAdapter {
    fn feed(&self) -> FeedKind {
        FeedKind::Declarations
    }

    fn adapt(&self, raw: &[u8]) -> Result<AdapterBatch> {
        let json: serde_json::Value = serde_json::from_slice(raw)?;
        let summaries = json["DisasterDeclarationsSummaries"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut batch = AdapterBatch::default();
        let now = Utc::now();

        for declaration in &summaries {
            let Some(number) = declaration["disasterNumber"].as_i64() else {
                debug!("declaration skipped: missing disaster number");
                batch.skipped_rows += 1;
                continue;
            };

            let incident_type = declaration["incidentType"].as_str().unwrap_or("Unknown");
            let kind = map_incident_type(incident_type);
            let declaration_type = declaration["declarationType"].as_str().unwrap_or("");
            let area = declaration["designatedArea"].as_str().unwrap_or("Unknown Area");
            let state = declaration["state"].as_str().unwrap_or("Unknown State");

            let coordinates = declaration["fipsStateCode"]
                .as_str()
                .and_then(state_centroid)
                .unwrap_or(Coordinates { lat: 0.0, lng: 0.0 });

            let began_at = declaration["incidentBeginDate"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now);

            batch.events.push(DisasterEvent {
                id: format!("fema-{number}"),
                name: format!("{kind} Declaration"),
                event_type: kind,
                location: format!("{area}, {state}"),
                coordinates,
                severity: classify_declaration(declaration_type),
                status: EventStatus::Active,
                magnitude: Some(incident_type.to_string()),
                estimated_affected_population: None,
                estimated_economic_impact_usd: None,
                description: format!(
                    "{kind} federal disaster declaration for {area}"
                ),
                source: "OpenFEMA".to_string(),
                created_at: began_at,
                updated_at: began_at.max(now),
            });
        }

        Ok(batch)
    }
}
