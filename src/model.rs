//! Canonical record types shared by every stage of the pipeline.
//!
//! Adapters produce these from raw source payloads; the reconciler stores
//! them; the scoring engine consumes and emits them. Records are immutable
//! once constructed — an update is a new value with the same identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Disaster category shared by events and predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Earthquake,
    Wildfire,
    Hurricane,
    Flood,
    Tornado,
    Volcano,
    Drought,
    Storm,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Earthquake => "earthquake",
            EventKind::Wildfire => "wildfire",
            EventKind::Hurricane => "hurricane",
            EventKind::Flood => "flood",
            EventKind::Tornado => "tornado",
            EventKind::Volcano => "volcano",
            EventKind::Drought => "drought",
            EventKind::Storm => "storm",
            EventKind::Other => "other",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity ladder, totally ordered: low < moderate < high < critical.
///
/// Variant declaration order drives the derived `Ord`; every comparison in
/// the pipeline relies on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Monitoring,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Seismic,
    Weather,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// One independently-updating external data source (plus the synthetic
/// predictions collection). Keys subscription interest and health tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Seismic,
    Wildfire,
    Weather,
    Declarations,
    Predictions,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Seismic => "seismic",
            FeedKind::Wildfire => "wildfire",
            FeedKind::Weather => "weather",
            FeedKind::Declarations => "declarations",
            FeedKind::Predictions => "predictions",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic point in floating degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Returns `None` when either component is out of range or non-finite.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }
}

/// One disaster occurrence as reported by an external registry.
///
/// `estimated_affected_population` and `estimated_economic_impact_usd` are
/// order-of-magnitude heuristics derived by the adapter, not measured
/// counts; downstream consumers must present them as estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterEvent {
    /// Namespaced identity, `<source>-<external id>`. Stable across fetches.
    pub id: String,
    pub name: String,
    pub event_type: EventKind,
    pub location: String,
    pub coordinates: Coordinates,
    pub severity: Severity,
    pub status: EventStatus,
    pub magnitude: Option<String>,
    pub estimated_affected_population: Option<u64>,
    pub estimated_economic_impact_usd: Option<u64>,
    pub description: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scored disaster forecast produced by the prediction engine.
///
/// `probability` and `confidence_score` are independent axes (both 0–100):
/// the first estimates how likely the event is, the second how reliable the
/// producing heuristic considers itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub prediction_type: EventKind,
    pub model_name: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub probability: f64,
    pub confidence_score: f64,
    pub severity_level: Severity,
    /// Validity window: `[timeframe_start, timeframe_end)`.
    pub timeframe_start: DateTime<Utc>,
    pub timeframe_end: DateTime<Utc>,
    pub is_active: bool,
    /// Ground-truth confirmation. Defaults to false at emission.
    pub verified: bool,
    /// Model-specific diagnostic fields, opaque to the pipeline.
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    /// A prediction past its validity window has aged out. Aging is
    /// advisory: callers flip `is_active`, nothing removes the record.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.timeframe_end
    }
}

/// A single physical observation from a monitoring station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub station_id: String,
    pub station_name: String,
    pub sensor_type: SensorKind,
    pub location: String,
    pub coordinates: Coordinates,
    pub reading_value: f64,
    pub reading_unit: String,
    /// Time of the physical observation, distinct from ingestion time.
    pub reading_time: DateTime<Utc>,
    pub data_quality: DataQuality,
    pub metadata: serde_json::Value,
}

/// Point weather telemetry fed to the prediction engine. Not stored as a
/// first-class collection.
///
/// Telemetry fields are optional: a missing field suppresses the heuristics
/// that need it rather than erroring or substituting a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSample {
    pub coordinates: Coordinates,
    /// Air temperature, °C.
    pub temperature_c: Option<f64>,
    /// Atmospheric pressure, hPa.
    pub pressure_hpa: Option<f64>,
    /// Relative humidity, percent.
    pub humidity_pct: Option<f64>,
    /// Wind speed, km/h.
    pub wind_speed_kmh: Option<f64>,
    /// Categorical condition code as reported by the source.
    pub condition_code: String,
}

/// Anything the reconciler can store: one opaque identity per record.
/// Two records with the same id are the same logical entity at different
/// points in time.
pub trait Record {
    fn id(&self) -> &str;
}

impl Record for DisasterEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Prediction {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for SensorReading {
    fn id(&self) -> &str {
        &self.id
    }
}
