use anyhow::Result;
use tracing::debug;

use super::adapter::{AdapterBatch, FeedAdapter};
use crate::model::{Coordinates, FeedKind, WeatherSample};

/// Normalizes a point weather response into one [`WeatherSample`].
///
/// Handles both providers the catalog can hand out: Open-Meteo (keyless)
/// and OpenWeather (`units=metric`), distinguished by payload shape.
/// Fields the source omits stay `None` — the scoring engine treats absence
/// as "do not evaluate", never as a default reading.
pub struct WeatherAdapter;

impl FeedAdapter for WeatherAdapter {
    fn feed(&self) -> FeedKind {
        FeedKind::Weather
    }

    fn adapt(&self, raw: &[u8]) -> Result<AdapterBatch> {
        let json: serde_json::Value = serde_json::from_slice(raw)?;
        let mut batch = AdapterBatch::default();

        let sample = if json["coord"].is_object() {
            openweather_sample(&json)
        } else {
            open_meteo_sample(&json)
        };

        match sample {
            Some(sample) => batch.samples.push(sample),
            None => {
                debug!("weather payload skipped: unparsable coordinates");
                batch.skipped_rows += 1;
            }
        }

        Ok(batch)
    }
}

fn open_meteo_sample(json: &serde_json::Value) -> Option<WeatherSample> {
    let coordinates = Coordinates::new(
        json["latitude"].as_f64()?,
        json["longitude"].as_f64()?,
    )?;

    let current = &json["current_weather"];
    let hourly = &json["hourly"];
    let first_hour = |field: &str| hourly[field].as_array()?.first()?.as_f64();

    Some(WeatherSample {
        coordinates,
        temperature_c: current["temperature"].as_f64(),
        pressure_hpa: first_hour("pressure_msl"),
        humidity_pct: first_hour("relativehumidity_2m"),
        wind_speed_kmh: current["windspeed"].as_f64(),
        condition_code: current["weathercode"]
            .as_i64()
            .map(|c| c.to_string())
            .unwrap_or_default(),
    })
}

/// OpenWeather with `units=metric`: temperature in °C, wind in m/s.
fn openweather_sample(json: &serde_json::Value) -> Option<WeatherSample> {
    let coordinates = Coordinates::new(
        json["coord"]["lat"].as_f64()?,
        json["coord"]["lon"].as_f64()?,
    )?;

    let main = &json["main"];

    Some(WeatherSample {
        coordinates,
        temperature_c: main["temp"].as_f64(),
        pressure_hpa: main["pressure"].as_f64(),
        humidity_pct: main["humidity"].as_f64(),
        wind_speed_kmh: json["wind"]["speed"].as_f64().map(|ms| ms * 3.6),
        condition_code: json["weather"][0]["id"]
            .as_i64()
            .map(|c| c.to_string())
            .unwrap_or_default(),
    })
}
