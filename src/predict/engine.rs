use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::json;

use crate::model::{
    Coordinates, DisasterEvent, EventKind, Prediction, Severity, WeatherSample,
};

/// Evaluates every heuristic against one weather sample (plus recent-event
/// context for the seismic heuristic) and returns the predictions that
/// cleared their activation floor.
///
/// Heuristics are independent: one sample can fire several of them.
/// Sub-threshold samples produce no record at all, keeping the predictions
/// collection a watchlist rather than a noise floor.
pub fn evaluate(
    sample: &WeatherSample,
    context: &[DisasterEvent],
    now: DateTime<Utc>,
) -> Vec<Prediction> {
    let mut predictions = Vec::new();

    predictions.extend(hurricane(sample, now));
    predictions.extend(flood(sample, now));
    predictions.extend(wildfire(sample, now));
    predictions.extend(earthquake(context, sample.coordinates, now));

    predictions
}

/// Returns deactivated copies of every prediction whose validity window has
/// passed. Aging is advisory: the caller merges these back by identity,
/// nothing is removed.
pub fn age_out(snapshot: &[Prediction], now: DateTime<Utc>) -> Vec<Prediction> {
    snapshot
        .iter()
        .filter(|p| p.is_active && p.is_expired(now))
        .map(|p| {
            let mut aged = p.clone();
            aged.is_active = false;
            aged
        })
        .collect()
}

fn jitter(span: f64) -> f64 {
    rand::thread_rng().gen_range(0.0..span)
}

fn prediction_id(kind: EventKind, coords: Coordinates, now: DateTime<Utc>) -> String {
    format!(
        "pred-{kind}-{:.2}-{:.2}-{}",
        coords.lat,
        coords.lng,
        now.timestamp_millis()
    )
}

fn build(
    kind: EventKind,
    model_name: &str,
    location: String,
    coords: Coordinates,
    probability: f64,
    confidence_score: f64,
    severity_level: Severity,
    window: (DateTime<Utc>, DateTime<Utc>),
    details: serde_json::Value,
    now: DateTime<Utc>,
) -> Prediction {
    Prediction {
        id: prediction_id(kind, coords, now),
        prediction_type: kind,
        model_name: model_name.to_string(),
        location,
        coordinates: coords,
        probability,
        confidence_score,
        severity_level,
        timeframe_start: window.0,
        timeframe_end: window.1,
        is_active: true,
        verified: false,
        details,
        created_at: now,
    }
}

/// Tropical cyclone formation: warm water, low pressure, wind, moisture.
fn hurricane(sample: &WeatherSample, now: DateTime<Utc>) -> Option<Prediction> {
    let (Some(temp), Some(pressure), Some(humidity), Some(wind)) = (
        sample.temperature_c,
        sample.pressure_hpa,
        sample.humidity_pct,
        sample.wind_speed_kmh,
    ) else {
        return None;
    };

    if !(temp > 26.0 && pressure < 1000.0 && wind > 15.0 && humidity > 70.0) {
        return None;
    }

    let probability =
        (40.0 + (30.0 - pressure / 30.0) + wind / 2.0 + humidity / 5.0).clamp(0.0, 90.0);
    let severity = if probability > 70.0 {
        Severity::Critical
    } else if probability > 50.0 {
        Severity::High
    } else {
        Severity::Moderate
    };

    Some(build(
        EventKind::Hurricane,
        "WeatherAI-Cyclone-v3",
        format!(
            "Coastal Region {:.1}°, {:.1}°",
            sample.coordinates.lat, sample.coordinates.lng
        ),
        sample.coordinates,
        probability,
        70.0 + jitter(20.0),
        severity,
        (now + Duration::days(1), now + Duration::days(5)),
        json!({
            "sea_surface_temp": temp,
            "atmospheric_pressure": pressure,
            "wind_shear": wind,
            "moisture_content": humidity,
        }),
        now,
    ))
}

/// Riverine flooding: saturated air, depressed pressure, warm temperature.
fn flood(sample: &WeatherSample, now: DateTime<Utc>) -> Option<Prediction> {
    let (Some(temp), Some(pressure), Some(humidity)) = (
        sample.temperature_c,
        sample.pressure_hpa,
        sample.humidity_pct,
    ) else {
        return None;
    };

    if !(humidity > 85.0 && pressure < 1005.0 && temp > 20.0) {
        return None;
    }

    let probability =
        (30.0 + (humidity - 70.0) + (1010.0 - pressure) * 2.0).clamp(0.0, 85.0);
    let severity = if probability > 60.0 {
        Severity::High
    } else {
        Severity::Moderate
    };

    Some(build(
        EventKind::Flood,
        "HydroAI-Flood-v2",
        format!(
            "River Basin {:.1}°N, {:.1}°W",
            sample.coordinates.lat, sample.coordinates.lng
        ),
        sample.coordinates,
        probability,
        65.0 + jitter(25.0),
        severity,
        (now + Duration::hours(12), now + Duration::days(3)),
        json!({
            "precipitation_forecast": "heavy",
            "soil_saturation": "high",
            "river_levels": "rising",
        }),
        now,
    ))
}

/// Fire weather: hot, dry, windy.
fn wildfire(sample: &WeatherSample, now: DateTime<Utc>) -> Option<Prediction> {
    let (Some(temp), Some(humidity), Some(wind)) = (
        sample.temperature_c,
        sample.humidity_pct,
        sample.wind_speed_kmh,
    ) else {
        return None;
    };

    if !(temp > 30.0 && humidity < 30.0 && wind > 20.0) {
        return None;
    }

    let probability =
        (25.0 + (temp - 25.0) * 2.0 + (40.0 - humidity) + wind).clamp(0.0, 88.0);
    let severity = if probability > 65.0 {
        Severity::Critical
    } else if probability > 45.0 {
        Severity::High
    } else {
        Severity::Moderate
    };

    Some(build(
        EventKind::Wildfire,
        "FireRiskAI-v4",
        format!(
            "Forest Region {:.1}°N, {:.1}°W",
            sample.coordinates.lat, sample.coordinates.lng
        ),
        sample.coordinates,
        probability,
        60.0 + jitter(30.0),
        severity,
        (now, now + Duration::days(7)),
        json!({
            "temperature": temp,
            "humidity_level": humidity,
            "wind_conditions": wind,
            "vegetation_dryness": "high",
        }),
        now,
    ))
}

/// Seismic outlook from recent activity: driven by the count of earthquake
/// events in the context window, not by the weather sample. Emitted only
/// above its activation floor of 30.
fn earthquake(
    context: &[DisasterEvent],
    coords: Coordinates,
    now: DateTime<Utc>,
) -> Option<Prediction> {
    let recent_count = context
        .iter()
        .filter(|e| e.event_type == EventKind::Earthquake)
        .count();

    let probability = (recent_count as f64 * 15.0 + jitter(20.0)).clamp(0.0, 85.0);
    if probability <= 30.0 {
        return None;
    }

    let severity = if probability > 60.0 {
        Severity::High
    } else {
        Severity::Moderate
    };

    Some(build(
        EventKind::Earthquake,
        "SeismicAI-2024",
        format!("{:.2}°N, {:.2}°W Region", coords.lat, coords.lng),
        coords,
        probability,
        60.0 + jitter(30.0),
        severity,
        (now, now + Duration::days(7)),
        json!({
            "recent_activity_count": recent_count,
            "factors": ["historical_activity", "tectonic_stress", "seasonal_patterns"],
        }),
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStatus;

    fn coords() -> Coordinates {
        Coordinates { lat: 25.8, lng: -80.2 }
    }

    fn sample(
        temp: Option<f64>,
        pressure: Option<f64>,
        humidity: Option<f64>,
        wind: Option<f64>,
    ) -> WeatherSample {
        WeatherSample {
            coordinates: coords(),
            temperature_c: temp,
            pressure_hpa: pressure,
            humidity_pct: humidity,
            wind_speed_kmh: wind,
            condition_code: "95".to_string(),
        }
    }

    fn quake_event(id: &str) -> DisasterEvent {
        let now = Utc::now();
        DisasterEvent {
            id: id.to_string(),
            name: "quake".to_string(),
            event_type: EventKind::Earthquake,
            location: "somewhere".to_string(),
            coordinates: coords(),
            severity: Severity::High,
            status: EventStatus::Active,
            magnitude: Some("6.0".to_string()),
            estimated_affected_population: None,
            estimated_economic_impact_usd: None,
            description: String::new(),
            source: "USGS".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn find(predictions: &[Prediction], kind: EventKind) -> Option<&Prediction> {
        predictions.iter().find(|p| p.prediction_type == kind)
    }

    #[test]
    fn test_hurricane_reference_sample() {
        // 40 + (30 - 990/30) + 20/2 + 80/5 = 40 - 3 + 10 + 16 = 63
        let now = Utc::now();
        let s = sample(Some(28.0), Some(990.0), Some(80.0), Some(20.0));
        let predictions = evaluate(&s, &[], now);

        let h = find(&predictions, EventKind::Hurricane).expect("hurricane must fire");
        assert!(h.probability <= 90.0);
        assert!((h.probability - 63.0).abs() < 1e-9);
        assert_eq!(h.severity_level, Severity::High);
        assert!((70.0..=90.0).contains(&h.confidence_score));
        assert_eq!(h.timeframe_start, now + Duration::days(1));
        assert_eq!(h.timeframe_end, now + Duration::days(5));
        assert!(!h.verified);
        assert!(h.is_active);
    }

    #[test]
    fn test_hurricane_extreme_sample_clamps_at_90_critical() {
        // Deep low with violent wind pushes the raw score past the clamp.
        let s = sample(Some(29.0), Some(950.0), Some(95.0), Some(80.0));
        let predictions = evaluate(&s, &[], Utc::now());

        let h = find(&predictions, EventKind::Hurricane).expect("hurricane must fire");
        assert_eq!(h.probability, 90.0);
        assert_eq!(h.severity_level, Severity::Critical);
    }

    #[test]
    fn test_flood_worked_example() {
        // 30 + (90-70) + (1010-1000)*2 = 70
        let now = Utc::now();
        let s = sample(Some(22.0), Some(1000.0), Some(90.0), Some(5.0));
        let predictions = evaluate(&s, &[], now);

        let f = find(&predictions, EventKind::Flood).expect("flood must fire");
        assert!((f.probability - 70.0).abs() < 1e-9);
        assert_eq!(f.severity_level, Severity::High);
        assert!((65.0..=90.0).contains(&f.confidence_score));
        assert_eq!(f.timeframe_start, now + Duration::hours(12));
        assert_eq!(f.timeframe_end, now + Duration::days(3));
    }

    #[test]
    fn test_wildfire_below_temperature_threshold_does_not_fire() {
        let s = sample(Some(25.0), Some(1010.0), Some(35.0), Some(18.0));
        let predictions = evaluate(&s, &[], Utc::now());

        assert!(find(&predictions, EventKind::Wildfire).is_none());
    }

    #[test]
    fn test_wildfire_fires_when_hot_dry_windy() {
        // 25 + (36-25)*2 + (40-20) + 25 = 92, clamp 88
        let s = sample(Some(36.0), Some(1010.0), Some(20.0), Some(25.0));
        let predictions = evaluate(&s, &[], Utc::now());

        let w = find(&predictions, EventKind::Wildfire).expect("wildfire must fire");
        assert_eq!(w.probability, 88.0);
        assert_eq!(w.severity_level, Severity::Critical);
        assert!((60.0..=90.0).contains(&w.confidence_score));
    }

    #[test]
    fn test_heuristics_fire_independently() {
        // Satisfies hurricane (t>26, p<1000, w>15, h>70) and flood
        // (h>85, p<1005, t>20) at once: both must be emitted.
        let s = sample(Some(27.0), Some(998.0), Some(90.0), Some(20.0));
        let predictions = evaluate(&s, &[], Utc::now());

        assert!(find(&predictions, EventKind::Hurricane).is_some());
        assert!(find(&predictions, EventKind::Flood).is_some());
    }

    #[test]
    fn test_missing_telemetry_suppresses_instead_of_erroring() {
        let s = sample(Some(28.0), None, Some(90.0), Some(20.0));
        let predictions = evaluate(&s, &[], Utc::now());

        assert!(find(&predictions, EventKind::Hurricane).is_none());
        assert!(find(&predictions, EventKind::Flood).is_none());
    }

    #[test]
    fn test_earthquake_needs_recent_context_to_clear_floor() {
        let calm = sample(Some(15.0), Some(1015.0), Some(40.0), Some(5.0));

        // No recent quakes: max attainable is 20, below the floor of 30.
        let none = evaluate(&calm, &[], Utc::now());
        assert!(find(&none, EventKind::Earthquake).is_none());

        // Three recent quakes: at least 45, always above the floor.
        let context = vec![quake_event("a"), quake_event("b"), quake_event("c")];
        let some = evaluate(&calm, &context, Utc::now());
        let e = find(&some, EventKind::Earthquake).expect("earthquake must fire");
        assert!(e.probability > 30.0);
        assert!(e.probability <= 85.0);
        assert!((60.0..=90.0).contains(&e.confidence_score));
    }

    #[test]
    fn test_age_out_flips_active_without_removing() {
        let now = Utc::now();
        let s = sample(Some(22.0), Some(1000.0), Some(90.0), Some(5.0));
        let predictions = evaluate(&s, &[], now);
        assert_eq!(predictions.len(), 1);

        // Not yet expired
        assert!(age_out(&predictions, now + Duration::days(1)).is_empty());

        let aged = age_out(&predictions, now + Duration::days(4));
        assert_eq!(aged.len(), 1);
        assert!(!aged[0].is_active);
        assert_eq!(aged[0].id, predictions[0].id);
    }
}
