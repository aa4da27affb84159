mod config;
mod db;
mod error;
mod fetcher;
mod merge;
mod metrics;
mod pipeline;
mod scorer;
mod session;
mod sources;
mod types;

use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::StockWriter;
use crate::error::Result;
use crate::pipeline::{run_cycle, RunOutcome, RunSummary, Sources};
use crate::session::current_session;
use crate::sources::{http_client, IdxClient, YahooClient};

const TOP_CANDIDATES: i64 = 10;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let started = Instant::now();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            emit(&RunSummary::failed(e.to_string()));
            std::process::exit(1);
        }
    };

    // stdout is reserved for the JSON summary.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    let summary = match run(&cfg).await {
        Ok(outcome) => {
            info!(
                passed = outcome.passed,
                dropped = outcome.dropped,
                skipped = outcome.skipped,
                fetched = outcome.fetch.succeeded,
                fetch_failed = outcome.fetch.failed + outcome.fetch.timed_out,
                cycle_secs = outcome.elapsed.as_secs_f64(),
                "Done: {} stocks in {:.1}s ({} persisted, {} batch failures)",
                outcome.total,
                started.elapsed().as_secs_f64(),
                outcome.persist.written,
                outcome.persist.batches_failed,
            );
            RunSummary::completed(&outcome, started.elapsed())
        }
        Err(e) => {
            error!("Fatal error: {e}");
            RunSummary::failed(e.to_string())
        }
    };

    emit(&summary);
    if !summary.success {
        std::process::exit(1);
    }
}

async fn run(cfg: &Config) -> Result<RunOutcome> {
    let session = current_session();

    // --- Database setup ---
    let pool = StockWriter::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);
    let writer = StockWriter::new(pool, cfg.upsert_batch_size);

    // --- Sources share one connection pool ---
    let http = http_client(cfg.summary_timeout)?;
    let idx = IdxClient::new(http.clone(), &cfg.idx_base_url, cfg.summary_timeout);
    let yahoo = YahooClient::new(http, &cfg.yahoo_base_url);
    let sources = Sources {
        primary: &idx,
        secondary: &yahoo,
        auxiliary: &idx,
    };

    let outcome = run_cycle(&sources, &writer, cfg, session).await?;

    match writer.top_candidates(TOP_CANDIDATES).await {
        Ok(top) if !top.is_empty() => {
            info!("Top {} candidates:", top.len());
            for c in &top {
                info!(
                    "  {:<6} score={:>3} price={:.0} chg={:+.2}% range={:.2}% vol={} nf={} mi={:.1} {} ({})",
                    c.symbol,
                    c.score,
                    c.price,
                    c.change_percent,
                    c.volatility,
                    c.volume,
                    c.net_foreign,
                    c.momentum_index,
                    c.acc_dist_status,
                    c.name,
                );
            }
        }
        Ok(_) => info!("No candidates passed the screen"),
        Err(e) => error!("Failed to read candidates: {e}"),
    }

    Ok(outcome)
}

fn emit(summary: &RunSummary) {
    match serde_json::to_string(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to encode summary: {e}"),
    }
}
