use async_trait::async_trait;
use reqwest::{Request, Response};

/// Abstraction over HTTP execution so adapters and probes can be exercised
/// against a stub transport in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
