//! Trait and types describing where disaster feeds live.

use anyhow::Result;
use tracing::warn;

use disastro_pipeline::model::{Coordinates, FeedKind};

/// Describes how a source requires authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAuth {
    /// No authentication required.
    None,
    /// API key must be appended as a URL query parameter with the given name.
    /// The key itself is read from the environment variable `env_key`.
    UrlParam { param_name: String, env_key: String },
}

impl FeedAuth {
    /// Returns `true` if any authentication credentials are needed.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, FeedAuth::None)
    }

    /// Resolves the credential from the environment, if this source needs one.
    pub fn resolve_key(&self) -> Result<Option<String>> {
        let env_key = match self {
            FeedAuth::None => return Ok(None),
            FeedAuth::UrlParam { env_key, .. } => env_key,
        };
        let value = std::env::var(env_key)
            .map_err(|_| anyhow::anyhow!("missing environment variable {}", env_key))?;
        Ok(Some(value))
    }
}

/// Metadata for a single upstream disaster source.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub kind: FeedKind,
    pub url: String,
    pub auth: FeedAuth,
}

/// Abstraction over a source registry. The built-in registry is static, but
/// the monitor loop only sees this trait.
#[async_trait::async_trait]
pub trait SourceCatalog {
    /// Returns all sources the pipeline should poll.
    async fn list_sources(&self) -> Result<Vec<FeedSource>>;
}

const USGS_ALL_DAY_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson";
const OPENFEMA_DECLARATIONS_URL: &str =
    "https://www.fema.gov/api/open/v2/DisasterDeclarationsSummaries?$top=20&$orderby=declarationDate%20desc";
const FIRMS_AREA_URL: &str =
    "https://firms.modaps.eosdis.nasa.gov/api/area/csv/{MAP_KEY}/VIIRS_SNPP_NRT/world/1";

/// The built-in source list: USGS seismic, NASA FIRMS wildfire, OpenFEMA
/// declarations, plus one weather source per watchpoint — OpenWeather when
/// a key is configured, Open-Meteo (keyless) otherwise.
pub struct StaticCatalog {
    watchpoints: Vec<(String, Coordinates)>,
    use_openweather: bool,
}

impl StaticCatalog {
    pub fn new(watchpoints: Vec<(String, Coordinates)>) -> Self {
        Self {
            watchpoints,
            use_openweather: std::env::var("OPENWEATHER_API_KEY").is_ok(),
        }
    }

    /// Overrides the weather provider choice regardless of environment.
    pub fn with_openweather(mut self, enabled: bool) -> Self {
        self.use_openweather = enabled;
        self
    }
}

impl Default for StaticCatalog {
    /// Watchpoints spanning the hazard regimes the heuristics cover:
    /// cyclone-prone coast, flood-prone delta, fire-prone inland.
    fn default() -> Self {
        let mut watchpoints = Vec::new();
        for (name, lat, lng) in [
            ("Miami", 25.7617, -80.1918),
            ("New Orleans", 29.9511, -90.0715),
            ("Los Angeles", 34.0522, -118.2437),
            ("San Francisco", 37.7749, -122.4194),
        ] {
            if let Some(coordinates) = Coordinates::new(lat, lng) {
                watchpoints.push((name.to_string(), coordinates));
            }
        }
        Self::new(watchpoints)
    }
}

#[async_trait::async_trait]
impl SourceCatalog for StaticCatalog {
    async fn list_sources(&self) -> Result<Vec<FeedSource>> {
        let mut sources = vec![
            FeedSource {
                id: "usgs-all-day".to_string(),
                name: "USGS all-day earthquakes".to_string(),
                kind: FeedKind::Seismic,
                url: USGS_ALL_DAY_URL.to_string(),
                auth: FeedAuth::None,
            },
            FeedSource {
                id: "openfema-declarations".to_string(),
                name: "OpenFEMA disaster declarations".to_string(),
                kind: FeedKind::Declarations,
                url: OPENFEMA_DECLARATIONS_URL.to_string(),
                auth: FeedAuth::None,
            },
        ];

        // FIRMS embeds the key in the URL path rather than a query parameter,
        // so it is resolved here instead of through a client decorator.
        match std::env::var("FIRMS_MAP_KEY") {
            Ok(map_key) => sources.push(FeedSource {
                id: "firms-viirs-snpp".to_string(),
                name: "NASA FIRMS VIIRS active fires".to_string(),
                kind: FeedKind::Wildfire,
                url: FIRMS_AREA_URL.replace("{MAP_KEY}", &map_key),
                auth: FeedAuth::None,
            }),
            Err(_) => warn!("FIRMS_MAP_KEY not set, skipping wildfire source"),
        }

        for (name, coordinates) in &self.watchpoints {
            let slug = name.to_lowercase().replace(' ', "-");
            let source = if self.use_openweather {
                FeedSource {
                    id: format!("openweather-{slug}"),
                    name: format!("OpenWeather {name}"),
                    kind: FeedKind::Weather,
                    url: format!(
                        "https://api.openweathermap.org/data/2.5/weather?lat={}&lon={}&units=metric",
                        coordinates.lat, coordinates.lng
                    ),
                    auth: FeedAuth::UrlParam {
                        param_name: "appid".to_string(),
                        env_key: "OPENWEATHER_API_KEY".to_string(),
                    },
                }
            } else {
                FeedSource {
                    id: format!("open-meteo-{slug}"),
                    name: format!("Open-Meteo {name}"),
                    kind: FeedKind::Weather,
                    url: format!(
                        "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}&current_weather=true&hourly=pressure_msl,relativehumidity_2m",
                        coordinates.lat, coordinates.lng
                    ),
                    auth: FeedAuth::None,
                }
            };
            sources.push(source);
        }

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_auth_none_requires_nothing() {
        assert!(!FeedAuth::None.requires_auth());
        assert_eq!(FeedAuth::None.resolve_key().unwrap(), None);
    }

    #[test]
    fn test_feed_auth_missing_env_var_errors() {
        let auth = FeedAuth::UrlParam {
            param_name: "appid".to_string(),
            env_key: "DISASTRO_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        assert!(auth.requires_auth());
        assert!(auth.resolve_key().is_err());
    }

    #[tokio::test]
    async fn test_default_catalog_covers_core_feeds() {
        let catalog = StaticCatalog::default();
        let sources = catalog.list_sources().await.unwrap();

        assert!(sources.iter().any(|s| s.kind == FeedKind::Seismic));
        assert!(sources.iter().any(|s| s.kind == FeedKind::Declarations));
        assert!(sources.iter().any(|s| s.kind == FeedKind::Weather));
        // one weather source per watchpoint
        assert_eq!(
            sources.iter().filter(|s| s.kind == FeedKind::Weather).count(),
            4
        );
    }

    #[tokio::test]
    async fn test_openweather_sources_carry_url_param_auth() {
        let catalog = StaticCatalog::default().with_openweather(true);
        let sources = catalog.list_sources().await.unwrap();

        let weather: Vec<_> = sources
            .iter()
            .filter(|s| s.kind == FeedKind::Weather)
            .collect();
        assert_eq!(weather.len(), 4);
        for source in weather {
            assert!(source.id.starts_with("openweather-"));
            assert_eq!(
                source.auth,
                FeedAuth::UrlParam {
                    param_name: "appid".to_string(),
                    env_key: "OPENWEATHER_API_KEY".to_string(),
                }
            );
        }
    }

    #[tokio::test]
    async fn test_keyless_weather_sources_need_no_auth() {
        let catalog = StaticCatalog::default().with_openweather(false);
        let sources = catalog.list_sources().await.unwrap();

        assert!(
            sources
                .iter()
                .filter(|s| s.kind == FeedKind::Weather)
                .all(|s| s.auth == FeedAuth::None && s.id.starts_with("open-meteo-"))
        );
    }

    #[tokio::test]
    async fn test_source_ids_are_unique() {
        let catalog = StaticCatalog::default();
        let sources = catalog.list_sources().await.unwrap();

        let mut ids: Vec<_> = sources.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), sources.len());
    }
}
