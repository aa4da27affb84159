use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::config::Config;
use crate::sources::SecondarySource;
use crate::types::SecondaryQuote;

/// Bounded fan-out settings for per-symbol fetches.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum outstanding fetches at any moment.
    pub workers: usize,
    /// Per-symbol deadline. A fetch past it counts as timed out.
    pub timeout: Duration,
    /// Report progress every N completions (and always on the last one).
    pub progress_every: usize,
}

impl From<&Config> for FetchOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            workers: cfg.fetch_workers,
            timeout: cfg.fetch_timeout,
            progress_every: cfg.progress_every,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    pub requested: usize,
    pub succeeded: usize,
    /// Fetch returned but carried no positive price.
    pub empty: usize,
    pub failed: usize,
    pub timed_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub quotes: HashMap<String, SecondaryQuote>,
    pub stats: FetchStats,
}

enum Attempt {
    Quote(SecondaryQuote),
    Empty,
    Failed,
    TimedOut,
}

/// Fetch a snapshot for every symbol with at most `opts.workers` requests in
/// flight. Failures and timeouts contribute nothing; nothing is retried.
///
/// Only snapshots with a positive price make it into the result map.
pub async fn fetch_secondary_quotes<S, F>(
    source: &S,
    symbols: &[String],
    opts: &FetchOptions,
    mut on_progress: F,
) -> FetchOutcome
where
    S: SecondarySource + ?Sized,
    F: FnMut(FetchProgress),
{
    let total = symbols.len();
    let mut outcome = FetchOutcome {
        quotes: HashMap::with_capacity(total),
        stats: FetchStats {
            requested: total,
            ..FetchStats::default()
        },
    };
    if total == 0 {
        return outcome;
    }

    let progress_every = opts.progress_every.max(1);
    let mut attempts = stream::iter(symbols.iter())
        .map(|symbol| async move {
            let attempt = match tokio::time::timeout(opts.timeout, source.fetch_quote(symbol)).await {
                Ok(Ok(quote)) if quote.price.is_some_and(|p| p > 0.0) => Attempt::Quote(quote),
                Ok(Ok(_)) => Attempt::Empty,
                Ok(Err(e)) => {
                    debug!(symbol = %symbol, "quote fetch failed: {e}");
                    Attempt::Failed
                }
                Err(_) => {
                    debug!(symbol = %symbol, "quote fetch timed out after {:?}", opts.timeout);
                    Attempt::TimedOut
                }
            };
            (symbol, attempt)
        })
        .buffer_unordered(opts.workers.max(1));

    let mut completed = 0usize;
    while let Some((symbol, attempt)) = attempts.next().await {
        match attempt {
            Attempt::Quote(quote) => {
                outcome.stats.succeeded += 1;
                outcome.quotes.insert(symbol.clone(), quote);
            }
            Attempt::Empty => outcome.stats.empty += 1,
            Attempt::Failed => outcome.stats.failed += 1,
            Attempt::TimedOut => outcome.stats.timed_out += 1,
        }

        completed += 1;
        if completed % progress_every == 0 || completed == total {
            on_progress(FetchProgress {
                completed,
                total,
                succeeded: outcome.stats.succeeded,
            });
        }
    }

    outcome
}
