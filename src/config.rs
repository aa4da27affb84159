use std::time::Duration;

use crate::error::{AppError, Result};

pub const IDX_BASE_URL: &str = "https://www.idx.co.id";
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Suffix the chart API uses for Jakarta-listed tickers.
pub const YAHOO_SYMBOL_SUFFIX: &str = ".JK";

/// Jakarta civil time (WIB) offset from UTC, in seconds. No DST.
pub const WIB_OFFSET_SECS: i32 = 7 * 3600;

/// Row id of the single market status record.
pub const MARKET_STATUS_ROW_ID: i64 = 1;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Liquid names used as the fetch universe when the exchange summary is down.
pub const FALLBACK_SYMBOLS: &[&str] = &[
    "BBCA", "BBRI", "BMRI", "BBNI", "BRIS", "ARTO", "BNGA",
    "TLKM", "EXCL", "ISAT", "FREN", "TOWR",
    "ASII", "UNTR", "AUTO", "SMSM",
    "UNVR", "HMSP", "ICBP", "INDF", "MYOR",
    "GOTO", "BREN", "AMMN", "CUAN", "BRPT",
    "MDKA", "EMTK", "MINA", "PANI", "BUKA", "ACES", "ERAA",
    "ANTM", "INCO", "PTBA", "ADRO", "MEDC",
    "CPIN", "JPFA", "MAIN",
    "SMGR", "INTP", "WIKA", "WSKT", "PTPP",
];

/// Regulatory auto-rejection band tiers, keyed on previous close.
pub mod price_bands {
    /// Prices strictly below this use the widest band.
    pub const LOW_TIER_MAX: f64 = 200.0;
    /// Prices up to and including this use the middle band.
    pub const MID_TIER_MAX: f64 = 5000.0;
    pub const LOW_TIER_PCT: i32 = 35;
    pub const MID_TIER_PCT: i32 = 25;
    pub const HIGH_TIER_PCT: i32 = 20;
    /// Lower band floor; the exchange never quotes below one rupiah.
    pub const MIN_LOWER_BAND: f64 = 1.0;
}

/// Weights for the accumulation/distribution heuristic.
pub mod acc_dist {
    pub const FOREIGN_FLOW_WEIGHT: i32 = 40;
    pub const ORDER_BOOK_WEIGHT: i32 = 35;
    pub const PRICE_ACTION_WEIGHT: i32 = 25;
    /// One side of the book must exceed the other by this factor to count.
    pub const IMBALANCE_RATIO: f64 = 1.2;
    /// |score| at or beyond this flips the label away from neutral.
    pub const CLASSIFY_THRESHOLD: i32 = 30;
}

/// Single-observation momentum index.
pub mod momentum {
    pub const NEUTRAL: f64 = 50.0;
    pub const SCALE: f64 = 25.0;
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;
}

/// Screening rule thresholds and points.
pub mod screening {
    pub const VOLUME_STRONG: i64 = 1_000_000;
    pub const VOLUME_WEAK: i64 = 500_000;
    pub const VOLUME_STRONG_POINTS: i32 = 20;
    pub const VOLUME_WEAK_POINTS: i32 = 10;

    pub const VOLATILITY_STRONG: f64 = 2.0;
    pub const VOLATILITY_WEAK: f64 = 1.0;
    pub const VOLATILITY_STRONG_POINTS: i32 = 20;
    pub const VOLATILITY_WEAK_POINTS: i32 = 10;

    pub const PRICE_MIN: f64 = 100.0;
    pub const PRICE_MAX: f64 = 10_000.0;
    pub const PRICE_POINTS: i32 = 15;

    pub const MOMENTUM_CORE: (f64, f64) = (30.0, 70.0);
    pub const MOMENTUM_OUTER: (f64, f64) = (20.0, 80.0);
    pub const MOMENTUM_CORE_POINTS: i32 = 15;
    pub const MOMENTUM_OUTER_POINTS: i32 = 8;

    pub const CHANGE_MIN_ABS_PCT: f64 = 0.5;
    pub const CHANGE_POINTS: i32 = 15;
    pub const UPTREND_BONUS: i32 = 5;

    pub const SPREAD_MAX_PCT: f64 = 2.0;
    pub const SPREAD_POINTS: i32 = 15;
    pub const WIDE_SPREAD_PENALTY: i32 = -5;

    pub const FOREIGN_INFLOW_POINTS: i32 = 15;
    pub const FOREIGN_HEAVY_INFLOW: i64 = 1_000_000;
    pub const FOREIGN_HEAVY_INFLOW_POINTS: i32 = 10;
    pub const ACCUMULATION_POINTS: i32 = 20;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub idx_base_url: String,
    pub yahoo_base_url: String,
    pub log_level: String,
    pub db_path: String,
    /// Concurrent outstanding chart fetches (FETCH_WORKERS)
    pub fetch_workers: usize,
    /// Per-symbol chart fetch timeout (FETCH_TIMEOUT_SECS)
    pub fetch_timeout: Duration,
    /// Timeout for the exchange summary endpoints (SUMMARY_TIMEOUT_SECS)
    pub summary_timeout: Duration,
    /// Rows per upsert transaction (UPSERT_BATCH_SIZE)
    pub upsert_batch_size: usize,
    /// Log fetch progress every N completions (PROGRESS_EVERY)
    pub progress_every: usize,
    /// Universe used when the exchange summary fails (FALLBACK_SYMBOLS, comma-separated).
    pub fallback_symbols: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idx_base_url: IDX_BASE_URL.to_string(),
            yahoo_base_url: YAHOO_BASE_URL.to_string(),
            log_level: "info".to_string(),
            db_path: "screener.db".to_string(),
            fetch_workers: 20,
            fetch_timeout: Duration::from_secs(10),
            summary_timeout: Duration::from_secs(30),
            upsert_batch_size: 100,
            progress_every: 100,
            fallback_symbols: FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fallback_symbols = match lookup("FALLBACK_SYMBOLS") {
            Some(raw) => {
                let symbols: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if symbols.is_empty() {
                    defaults.fallback_symbols
                } else {
                    symbols
                }
            }
            None => defaults.fallback_symbols,
        };

        Ok(Self {
            idx_base_url: lookup("IDX_BASE_URL").unwrap_or(defaults.idx_base_url),
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            db_path: lookup("DB_PATH").unwrap_or(defaults.db_path),
            fetch_workers: parse_positive(&lookup, "FETCH_WORKERS", defaults.fetch_workers)?,
            fetch_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            summary_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "SUMMARY_TIMEOUT_SECS",
                defaults.summary_timeout.as_secs(),
            )?),
            upsert_batch_size: parse_positive(
                &lookup,
                "UPSERT_BATCH_SIZE",
                defaults.upsert_batch_size,
            )?,
            progress_every: parse_positive(&lookup, "PROGRESS_EVERY", defaults.progress_every)?,
            fallback_symbols,
        })
    }
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}
