mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, anyhow};

/// Fetches a URL and returns the raw response body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("request to {url} returned status {status}"));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Polls a liveness endpoint. Returns `true` only for a 2xx response;
/// a transport error counts as not-ok rather than propagating.
pub async fn probe_health<C: HttpClient>(client: &C, url: &str) -> bool {
    let Ok(parsed) = url.parse() else {
        return false;
    };
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);
    match client.execute(req).await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
