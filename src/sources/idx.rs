use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use tracing::{debug, info, warn};

use super::{get_json, AuxiliarySource, PrimarySource};
use crate::error::SourceError;
use crate::types::{IndicativeQuote, PrimaryQuote};

const SUMMARY_PATH: &str = "/primary/TradingSummary/GetStockSummary";
const PRE_OPENING_PATH: &str = "/primary/TradingSummary/GetPreOpeningSummary";
const PRE_CLOSING_PATH: &str = "/primary/TradingSummary/GetPreClosingSummary";
const REFERER_PATH: &str = "/id/data-pasar/ringkasan-perdagangan/ringkasan-saham/";

/// Rows requested per summary call; large enough to cover every listing.
const SUMMARY_PAGE_LENGTH: &str = "9999";

/// Exchange (IDX) trading summary client. Serves as both the primary and the
/// auxiliary (IEP/IEV) source.
pub struct IdxClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl IdxClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9,id;q=0.8"));
        h.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        if let Ok(referer) = HeaderValue::from_str(&format!("{}{}", self.base_url, REFERER_PATH)) {
            h.insert(REFERER, referer);
        }
        h
    }

    async fn get_rows(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .client
            .get(&url)
            .query(query)
            .headers(self.headers())
            .timeout(self.timeout);
        let body = get_json(request).await?;
        extract_rows(body)
    }
}

#[async_trait]
impl PrimarySource for IdxClient {
    async fn fetch_summary(&self) -> Result<HashMap<String, PrimaryQuote>, SourceError> {
        let rows = self
            .get_rows(SUMMARY_PATH, &[("length", SUMMARY_PAGE_LENGTH), ("start", "0")])
            .await?;
        let summary = parse_summary_rows(rows);
        if summary.is_empty() {
            return Err(SourceError::Empty);
        }
        info!(stocks = summary.len(), "IDX summary: {} stocks", summary.len());
        Ok(summary)
    }
}

#[async_trait]
impl AuxiliarySource for IdxClient {
    /// Tries the pre-opening endpoint, then pre-closing. First non-empty wins.
    async fn fetch_indicative(&self) -> Result<HashMap<String, IndicativeQuote>, SourceError> {
        let mut last_err = SourceError::Empty;
        for path in [PRE_OPENING_PATH, PRE_CLOSING_PATH] {
            match self.get_rows(path, &[]).await {
                Ok(rows) => {
                    let quotes = parse_indicative_rows(rows);
                    if !quotes.is_empty() {
                        info!(stocks = quotes.len(), endpoint = path, "IEP/IEV: {} stocks", quotes.len());
                        return Ok(quotes);
                    }
                    debug!(endpoint = path, "IEP/IEV endpoint returned no rows");
                }
                Err(e) => {
                    warn!(endpoint = path, "IEP/IEV fetch failed: {e}");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// Pull the `data` array out of an IDX response envelope.
fn extract_rows(body: serde_json::Value) -> Result<Vec<serde_json::Value>, SourceError> {
    match body {
        serde_json::Value::Object(mut obj) => match obj.remove("data") {
            Some(serde_json::Value::Array(rows)) => Ok(rows),
            Some(serde_json::Value::Null) | None => {
                Err(SourceError::Malformed("response has no `data` array".to_string()))
            }
            Some(_) => Err(SourceError::Malformed("`data` is not an array".to_string())),
        },
        _ => Err(SourceError::Malformed("response is not an object".to_string())),
    }
}

/// Rows that fail to decode or carry no stock code are dropped individually.
pub fn parse_summary_rows(rows: Vec<serde_json::Value>) -> HashMap<String, PrimaryQuote> {
    let mut out = HashMap::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<PrimaryQuote>(row) {
            Ok(q) if !q.stock_code.trim().is_empty() => {
                out.insert(q.stock_code.trim().to_uppercase(), q);
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping undecodable summary row: {e}"),
        }
    }
    out
}

pub fn parse_indicative_rows(rows: Vec<serde_json::Value>) -> HashMap<String, IndicativeQuote> {
    rows.into_iter()
        .filter_map(|row| serde_json::from_value::<IndicativeQuote>(row).ok())
        .filter(|q| !q.stock_code.trim().is_empty())
        .map(|q| (q.stock_code.trim().to_uppercase(), q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_without_data_is_malformed() {
        assert!(matches!(
            extract_rows(json!({ "recordsTotal": 0 })),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(extract_rows(json!([1, 2])), Err(SourceError::Malformed(_))));
        assert_eq!(extract_rows(json!({ "data": [] })).unwrap().len(), 0);
    }

    #[test]
    fn summary_rows_are_keyed_by_code() {
        let rows = vec![
            json!({ "StockCode": "bbca ", "Close": 9875, "ForeignBuy": 120000 }),
            json!({ "StockCode": "", "Close": 100 }),
            json!({ "StockCode": 42 }),
            json!({ "StockCode": "TLKM", "Close": 3100 }),
        ];
        let map = parse_summary_rows(rows);
        assert_eq!(map.len(), 2);
        assert_eq!(map["BBCA"].close, Some(9875.0));
        assert_eq!(map["BBCA"].foreign_buy, Some(120000.0));
        assert!(map.contains_key("TLKM"));
    }

    #[test]
    fn indicative_rows_skip_missing_codes() {
        let rows = vec![
            json!({ "StockCode": "ASII", "IEP": 5025, "IEV": 1200 }),
            json!({ "IEP": 10 }),
        ];
        let map = parse_indicative_rows(rows);
        assert_eq!(map.len(), 1);
        assert_eq!(map["ASII"].price(), 5025.0);
        assert_eq!(map["ASII"].volume(), 1200.0);
    }
}
