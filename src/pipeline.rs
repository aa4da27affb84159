use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{PersistReport, StockWriter};
use crate::error::{AppError, Result};
use crate::fetcher::{fetch_secondary_quotes, FetchOptions, FetchStats};
use crate::merge::{merge_all, SourceSet};
use crate::scorer::evaluate;
use crate::sources::{AuxiliarySource, PrimarySource, SecondarySource};
use crate::types::{MarketSession, ScreeningResult};

/// The three feeds one cycle reads from. Injected so tests can swap them.
pub struct Sources<'a> {
    pub primary: &'a dyn PrimarySource,
    pub secondary: &'a dyn SecondarySource,
    pub auxiliary: &'a dyn AuxiliarySource,
}

#[derive(Debug)]
pub struct RunOutcome {
    /// Records scored and handed to the store.
    pub total: usize,
    pub passed: usize,
    /// Symbols dropped for lack of a positive price.
    pub dropped: usize,
    /// Symbols skipped on a record-level error.
    pub skipped: usize,
    pub fetch: FetchStats,
    pub persist: PersistReport,
    pub session: MarketSession,
    pub elapsed: Duration,
}

/// Machine-readable result printed on stdout.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_status: Option<MarketSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    pub fn completed(outcome: &RunOutcome, elapsed: Duration) -> Self {
        Self {
            success: true,
            total: Some(outcome.total),
            market_status: Some(outcome.session.clone()),
            elapsed_seconds: Some((elapsed.as_secs_f64() * 100.0).round() / 100.0),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total: None,
            market_status: None,
            elapsed_seconds: None,
            error: Some(error.into()),
        }
    }
}

/// Run one fetch → merge → score → persist cycle.
///
/// Source failures degrade the run; only losing both the exchange summary
/// and every chart snapshot is fatal.
pub async fn run_cycle(
    sources: &Sources<'_>,
    writer: &StockWriter,
    cfg: &Config,
    session: MarketSession,
) -> Result<RunOutcome> {
    let started = Instant::now();
    info!(status = %session.status, session = %session.session, "Market: {}", session.message);
    if !session.should_update {
        info!("Session does not require an update; running anyway");
    }

    let primary = match sources.primary.fetch_summary().await {
        Ok(rows) => {
            info!("Got {} stocks from exchange summary", rows.len());
            rows
        }
        Err(e) => {
            warn!("Exchange summary unavailable: {e}");
            HashMap::new()
        }
    };

    let symbols: Vec<String> = if primary.is_empty() {
        warn!("Using fallback universe of {} symbols", cfg.fallback_symbols.len());
        cfg.fallback_symbols.clone()
    } else {
        let mut keys: Vec<String> = primary.keys().cloned().collect();
        keys.sort();
        keys
    };

    let opts = FetchOptions::from(cfg);
    info!(workers = opts.workers, "Fetching {} chart snapshots", symbols.len());
    let fetched = fetch_secondary_quotes(sources.secondary, &symbols, &opts, |p| {
        info!("Progress: {}/{} ({} ok)", p.completed, p.total, p.succeeded);
    })
    .await;
    let stats = fetched.stats;
    info!(
        succeeded = stats.succeeded,
        empty = stats.empty,
        failed = stats.failed,
        timed_out = stats.timed_out,
        "Chart fetch complete"
    );

    let auxiliary = if session.wants_indicative() {
        match sources.auxiliary.fetch_indicative().await {
            Ok(rows) => {
                info!("Got {} indicative prices", rows.len());
                rows
            }
            Err(e) => {
                warn!("Indicative prices unavailable: {e}");
                HashMap::new()
            }
        }
    } else {
        HashMap::new()
    };

    if primary.is_empty() && fetched.quotes.is_empty() {
        return Err(AppError::NoData(
            "exchange summary and chart snapshots both empty".to_string(),
        ));
    }

    let merged = merge_all(SourceSet {
        primary: &primary,
        secondary: &fetched.quotes,
        auxiliary: &auxiliary,
    });
    let results: Vec<ScreeningResult> = merged.records.into_iter().map(evaluate).collect();
    let passed = results.iter().filter(|r| r.passed).count();
    info!(
        dropped = merged.dropped,
        skipped = merged.skipped.len(),
        "Scored {} stocks, {} passed screen",
        results.len(),
        passed
    );

    let persist = writer.upsert_stocks(&results).await;
    if persist.batches_failed > 0 {
        warn!(
            "{} of {} batches failed to persist",
            persist.batches_failed,
            persist.batches_ok + persist.batches_failed
        );
    }
    if let Err(e) = writer.upsert_market_status(&session).await {
        warn!("Failed to update market status: {e}");
    }

    Ok(RunOutcome {
        total: results.len(),
        passed,
        dropped: merged.dropped,
        skipped: merged.skipped.len(),
        fetch: stats,
        persist,
        session,
        elapsed: started.elapsed(),
    })
}
