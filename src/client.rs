//! The ADS (SciX) API client.

use crate::error::{Result, ScitexError};
use crate::rate_limit::RateLimiter;
use reqwest::Client;
use std::time::Duration;

/// Async client for the SciX (NASA ADS) API.
///
/// Covers the three calls scitex needs: identifier lookup, author/year
/// search, and BibTeX export.
#[derive(Clone)]
pub struct AdsClient {
    pub(crate) http: Client,
    pub(crate) api_token: String,
    pub(crate) base_url: String,
    pub(crate) rate_limiter: RateLimiter,
}

impl AdsClient {
    /// Create a new client with the given API token.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::build(api_token.into(), true)
    }

    /// Create a client that skips TLS certificate verification.
    ///
    /// Only for networks with intercepting proxies; the CLI requires an
    /// interactive confirmation before selecting this.
    pub fn new_without_ssl_verification(api_token: impl Into<String>) -> Result<Self> {
        Self::build(api_token.into(), false)
    }

    fn build(api_token: String, verify_ssl: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            http,
            api_token,
            base_url: "https://api.adsabs.harvard.edu/v1".to_string(),
            rate_limiter: RateLimiter::new(5.0),
        })
    }

    /// Read the API token from `ADS_API_TOKEN` (or `SCIX_API_TOKEN`).
    pub fn token_from_env() -> Result<String> {
        let token = std::env::var("ADS_API_TOKEN")
            .or_else(|_| std::env::var("SCIX_API_TOKEN"))
            .map_err(|_| ScitexError::AuthRequired)?;
        if token.is_empty() {
            return Err(ScitexError::AuthRequired);
        }
        Ok(token)
    }

    /// Override the base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let request = self.http.get(self.url(path)).query(params);
        self.dispatch(request).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub(crate) async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let request = self.http.post(self.url(path)).json(body);
        self.dispatch(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pace, authenticate, send, and record the quota headers.
    async fn dispatch(&self, request: reqwest::RequestBuilder) -> Result<String> {
        self.rate_limiter.acquire().await;

        let response = request
            .bearer_auth(&self.api_token)
            .header("User-Agent", concat!("scitex/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;
        self.rate_limiter.observe(response.headers()).await;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response.text().await?),
            401 => Err(ScitexError::AuthRequired),
            429 => Err(ScitexError::RateLimited {
                retry_after: retry_after(response.headers()),
            }),
            _ => Err(ScitexError::Api {
                status,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let seconds = headers.get("retry-after")?.to_str().ok()?.parse().ok()?;
    Some(Duration::from_secs(seconds))
}
