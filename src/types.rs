use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Market session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    PreOpening,
    Open,
    Break,
    PreClosing,
    Closing,
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::PreOpening => "pre_opening",
            SessionStatus::Open => "open",
            SessionStatus::Break => "break",
            SessionStatus::PreClosing => "pre_closing",
            SessionStatus::Closing => "closing",
            SessionStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "weekend")]
    Weekend,
    #[serde(rename = "pre_open")]
    PreOpen,
    #[serde(rename = "session_1")]
    Session1,
    #[serde(rename = "lunch")]
    Lunch,
    #[serde(rename = "session_2")]
    Session2,
    #[serde(rename = "pre_close")]
    PreClose,
    #[serde(rename = "closing")]
    Closing,
    #[serde(rename = "after_hours")]
    AfterHours,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionKind::Weekend => "weekend",
            SessionKind::PreOpen => "pre_open",
            SessionKind::Session1 => "session_1",
            SessionKind::Lunch => "lunch",
            SessionKind::Session2 => "session_2",
            SessionKind::PreClose => "pre_close",
            SessionKind::Closing => "closing",
            SessionKind::AfterHours => "after_hours",
        };
        write!(f, "{s}")
    }
}

/// Trading session at a point in time, with what the exchange allows during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSession {
    pub status: SessionStatus,
    pub session: SessionKind,
    pub message: String,
    pub can_trade: bool,
    pub should_update: bool,
}

impl MarketSession {
    /// Auction sessions publish indicative equilibrium prices.
    pub fn wants_indicative(&self) -> bool {
        matches!(self.session, SessionKind::PreOpen | SessionKind::PreClose)
    }
}

// ---------------------------------------------------------------------------
// Raw source records
// ---------------------------------------------------------------------------

/// One row of the exchange trading summary. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PrimaryQuote {
    pub stock_code: String,
    pub stock_name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub previous: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub open_price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    /// Last traded price.
    #[serde(deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub change: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub frequency: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub foreign_buy: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub foreign_sell: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub listed_shares: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bid: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bid_volume: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub offer: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub offer_volume: Option<f64>,
}

/// Per-symbol chart snapshot from the secondary source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryQuote {
    pub symbol: String,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
    pub name: Option<String>,
}

/// Pre-open / pre-close auction row. The exchange uses two naming schemes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndicativeQuote {
    #[serde(rename = "StockCode")]
    pub stock_code: String,
    #[serde(rename = "IEP", deserialize_with = "lenient_f64")]
    pub iep: Option<f64>,
    #[serde(rename = "TheoreticalPrice", deserialize_with = "lenient_f64")]
    pub theoretical_price: Option<f64>,
    #[serde(rename = "IEV", deserialize_with = "lenient_f64")]
    pub iev: Option<f64>,
    #[serde(rename = "TheoreticalVolume", deserialize_with = "lenient_f64")]
    pub theoretical_volume: Option<f64>,
}

impl IndicativeQuote {
    pub fn price(&self) -> f64 {
        first_nonzero(&[self.iep, self.theoretical_price])
    }

    pub fn volume(&self) -> f64 {
        first_nonzero(&[self.iev, self.theoretical_volume])
    }
}

/// First candidate that is present and non-zero, else 0.
pub fn first_nonzero(candidates: &[Option<f64>]) -> f64 {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}

/// Accepts a JSON number, a numeric string, or null. Anything else reads as absent.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Merged + derived records
// ---------------------------------------------------------------------------

/// Canonical per-symbol quote. All fields resolved; missing numbers are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedStockRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub prev_close: f64,
    pub open_price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    /// Exchange-reported change, used only when previous close is unknown.
    #[serde(skip)]
    pub reported_change: f64,
    pub frequency: i64,
    pub value: f64,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: i64,
    pub ask_size: i64,
    pub foreign_buy: i64,
    pub foreign_sell: i64,
    #[serde(skip)]
    pub listed_shares: f64,
    /// Last price from the chart snapshot alone; zero when there was none.
    #[serde(skip)]
    pub chart_price: f64,
    pub iep: f64,
    pub iev: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccDistStatus {
    Accumulation,
    Distribution,
    Neutral,
}

impl std::fmt::Display for AccDistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccDistStatus::Accumulation => "accumulation",
            AccDistStatus::Distribution => "distribution",
            AccDistStatus::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

/// ARA (upper) / ARB (lower) auto-rejection bands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceBands {
    pub ara: f64,
    pub arb: f64,
    pub ara_pct: i32,
    pub arb_pct: i32,
}

/// Analytics derived from a merged record. Percentages rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub change: f64,
    pub change_percent: f64,
    pub volatility: f64,
    pub spread: f64,
    pub net_foreign: i64,
    #[serde(flatten)]
    pub bands: PriceBands,
    pub acc_dist_status: AccDistStatus,
    pub acc_dist_score: i32,
    pub market_cap: i64,
}

/// Final row handed to the persister.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    #[serde(flatten)]
    pub record: MergedStockRecord,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    pub momentum_index: f64,
    pub score: i32,
    #[serde(rename = "passed_screen")]
    pub passed: bool,
}
