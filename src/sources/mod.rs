//! Quote sources. Each trait is one fetch primitive; failures come back as
//! [`SourceError`] and callers decide whether that means "no data".

pub mod idx;
pub mod yahoo;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BROWSER_USER_AGENT;
use crate::error::{Result, SourceError};
use crate::types::{IndicativeQuote, PrimaryQuote, SecondaryQuote};

pub use idx::IdxClient;
pub use yahoo::YahooClient;

/// Exchange-wide trading summary, keyed by symbol.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    async fn fetch_summary(&self) -> std::result::Result<HashMap<String, PrimaryQuote>, SourceError>;
}

/// Per-symbol snapshot, called once per symbol by the fetch orchestrator.
#[async_trait]
pub trait SecondarySource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> std::result::Result<SecondaryQuote, SourceError>;
}

/// Auction-session indicative prices, keyed by symbol.
#[async_trait]
pub trait AuxiliarySource: Send + Sync {
    async fn fetch_indicative(
        &self,
    ) -> std::result::Result<HashMap<String, IndicativeQuote>, SourceError>;
}

/// Shared HTTP client. Built once and handed to every source.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()?)
}

/// GET a URL and decode JSON, mapping non-2xx to [`SourceError::Status`].
async fn get_json(
    request: reqwest::RequestBuilder,
) -> std::result::Result<serde_json::Value, SourceError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))
}
