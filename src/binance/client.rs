// =============================================================================
// Binance USDⓈ-M Futures REST Client — public market-data endpoints
// =============================================================================
//
// All three endpoints this service needs are public: no API key, no request
// signing. The base URL is overridable so tests can point the client at a
// local mock server.
// =============================================================================

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Default USDⓈ-M futures REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

// =============================================================================
// Response types
// =============================================================================

/// One entry from GET /fapi/v1/fundingInfo — the funding settlement spec
/// for a perpetual contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingInfo {
    pub symbol: String,
    pub funding_interval_hours: f64,
}

/// One entry from GET /fapi/v1/premiumIndex — the current funding snapshot.
///
/// `lastFundingRate` is a string-encoded decimal and is absent or empty for
/// contracts without an active funding rate (e.g. delivery contracts).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    #[serde(default)]
    pub last_funding_rate: Option<String>,
}

/// One entry from GET /fapi/v1/ticker/24hr — rolling 24-hour statistics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub quote_volume: String,
}

// =============================================================================
// Client
// =============================================================================

/// REST client for the Binance futures public endpoints.
#[derive(Debug, Clone)]
pub struct FuturesClient {
    base_url: String,
    client: reqwest::Client,
}

impl FuturesClient {
    /// Create a client against `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// GET /fapi/v1/fundingInfo — funding interval per symbol.
    #[instrument(skip(self), name = "binance::get_funding_info")]
    pub async fn get_funding_info(&self) -> Result<Vec<FundingInfo>> {
        let items: Vec<FundingInfo> = self.get_json("/fapi/v1/fundingInfo").await?;
        debug!(count = items.len(), "funding info fetched");
        Ok(items)
    }

    /// GET /fapi/v1/premiumIndex — current funding rate per symbol.
    #[instrument(skip(self), name = "binance::get_premium_index")]
    pub async fn get_premium_index(&self) -> Result<Vec<PremiumIndex>> {
        let items: Vec<PremiumIndex> = self.get_json("/fapi/v1/premiumIndex").await?;
        debug!(count = items.len(), "premium index fetched");
        Ok(items)
    }

    /// GET /fapi/v1/ticker/24hr — 24-hour quote volume per symbol.
    #[instrument(skip(self), name = "binance::get_ticker_24hr")]
    pub async fn get_ticker_24hr(&self) -> Result<Vec<Ticker24h>> {
        let items: Vec<Ticker24h> = self.get_json("/fapi/v1/ticker/24hr").await?;
        debug!(count = items.len(), "24h tickers fetched");
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Issue a GET against `path`, check the status, and deserialize the body.
    ///
    /// A non-2xx response is an error carrying the status and body text so
    /// the cause ends up in the diagnostics log.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read {path} response body"))?;

        if !status.is_success() {
            anyhow::bail!("Binance GET {path} returned {status}: {body}");
        }

        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse {path} response body"))
    }
}

impl Default for FuturesClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
