//! Feed adapters: one per external source.
//!
//! Each adapter normalizes one payload shape (USGS GeoJSON, FIRMS CSV,
//! OpenFEMA JSON, Open-Meteo JSON) into canonical records, applying the
//! source's severity classification. Adapters are pure and stateless;
//! malformed rows are skipped and counted, never fatal.

mod adapter;
mod declarations;
mod seismic;
mod weather;
mod wildfire;

pub use adapter::{AdapterBatch, FeedAdapter};
pub use declarations::DeclarationsAdapter;
pub use seismic::SeismicAdapter;
pub use weather::WeatherAdapter;
pub use wildfire::WildfireAdapter;
