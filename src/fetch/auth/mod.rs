//! Credential-injecting wrapper around [`HttpClient`](super::HttpClient).
//!
//! Keyed disaster registries take their API key as a URL query parameter
//! (OpenWeather's `appid`). Wrapping the client keeps adapters free of
//! per-source auth branching.

mod url_param;

pub use url_param::UrlParam;
