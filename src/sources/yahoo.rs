use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};

use super::{get_json, SecondarySource};
use crate::config::YAHOO_SYMBOL_SUFFIX;
use crate::error::SourceError;
use crate::types::SecondaryQuote;

/// Yahoo Finance chart API, one request per symbol.
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SecondarySource for YahooClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<SecondaryQuote, SourceError> {
        let url = format!(
            "{}/v8/finance/chart/{}{}",
            self.base_url, symbol, YAHOO_SYMBOL_SUFFIX
        );
        let request = self
            .client
            .get(&url)
            .query(&[("interval", "1m"), ("range", "1d")])
            .header(ACCEPT, HeaderValue::from_static("*/*"));
        let body = get_json(request).await?;
        parse_chart(symbol, &body)
    }
}

/// Read the snapshot fields out of a `/v8/finance/chart` response.
///
/// Open prefers the first non-null intraday bar over `regularMarketOpen`,
/// which the API often leaves unset during the session.
pub fn parse_chart(symbol: &str, body: &serde_json::Value) -> Result<SecondaryQuote, SourceError> {
    let result = body
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| SourceError::Malformed("chart.result is empty".to_string()))?;

    let meta = result
        .get("meta")
        .ok_or_else(|| SourceError::Malformed("chart.result[0].meta missing".to_string()))?;

    // Zero reads as missing so the next candidate gets a chance.
    let num = |key: &str| meta.get(key).and_then(|v| v.as_f64()).filter(|v| *v != 0.0);

    let first_bar_open = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.as_array())
        .and_then(|q| q.first())
        .and_then(|q| q.get("open"))
        .and_then(|o| o.as_array())
        .and_then(|opens| opens.iter().find_map(|o| o.as_f64()))
        .filter(|v| *v != 0.0);

    let name = ["shortName", "longName"]
        .iter()
        .filter_map(|k| meta.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);

    Ok(SecondaryQuote {
        symbol: symbol.to_string(),
        price: num("regularMarketPrice"),
        previous_close: num("previousClose").or_else(|| num("chartPreviousClose")),
        open: first_bar_open.or_else(|| num("regularMarketOpen")),
        high: num("regularMarketDayHigh"),
        low: num("regularMarketDayLow"),
        volume: num("regularMarketVolume"),
        name,
    })
}
