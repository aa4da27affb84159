use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::config::MARKET_STATUS_ROW_ID;
use crate::db::models::{CandidateRow, MarketStatusRow};
use crate::error::Result;
use crate::metrics::round2;
use crate::types::{MarketSession, ScreeningResult};

/// Outcome of a batched upsert. A failed batch never stops the next one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistReport {
    pub written: usize,
    pub batches_ok: usize,
    pub batches_failed: usize,
}

/// Upserts screened stocks and the market status row into SQLite.
pub struct StockWriter {
    pool: SqlitePool,
    batch_size: usize,
}

impl StockWriter {
    pub fn new(pool: SqlitePool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(pool)
    }

    /// Upsert rows keyed by symbol, one transaction per batch.
    pub async fn upsert_stocks(&self, rows: &[ScreeningResult]) -> PersistReport {
        let mut report = PersistReport::default();
        let total_batches = rows.len().div_ceil(self.batch_size);
        let updated_at = Utc::now().to_rfc3339();

        for (i, batch) in rows.chunks(self.batch_size).enumerate() {
            match self.write_batch(batch, &updated_at).await {
                Ok(()) => {
                    report.batches_ok += 1;
                    report.written += batch.len();
                    info!("Uploaded batch {}/{}", i + 1, total_batches);
                }
                Err(e) => {
                    report.batches_failed += 1;
                    error!(batch = i + 1, rows = batch.len(), "Batch upsert failed: {e}");
                }
            }
        }

        report
    }

    async fn write_batch(&self, batch: &[ScreeningResult], updated_at: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in batch {
            let r = &row.record;
            let m = &row.metrics;
            sqlx::query(
                r#"
                INSERT INTO stocks (
                    symbol, name, price, open_price, high, low, prev_close,
                    change, change_percent, volume, frequency, value,
                    bid, ask, bid_size, ask_size, iep, iev,
                    ara, arb, ara_pct, arb_pct,
                    foreign_buy, foreign_sell, net_foreign,
                    acc_dist_status, acc_dist_score, market_cap,
                    volatility, spread, momentum_index, score, passed_screen, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(symbol) DO UPDATE SET
                    name = excluded.name,
                    price = excluded.price,
                    open_price = excluded.open_price,
                    high = excluded.high,
                    low = excluded.low,
                    prev_close = excluded.prev_close,
                    change = excluded.change,
                    change_percent = excluded.change_percent,
                    volume = excluded.volume,
                    frequency = excluded.frequency,
                    value = excluded.value,
                    bid = excluded.bid,
                    ask = excluded.ask,
                    bid_size = excluded.bid_size,
                    ask_size = excluded.ask_size,
                    iep = excluded.iep,
                    iev = excluded.iev,
                    ara = excluded.ara,
                    arb = excluded.arb,
                    ara_pct = excluded.ara_pct,
                    arb_pct = excluded.arb_pct,
                    foreign_buy = excluded.foreign_buy,
                    foreign_sell = excluded.foreign_sell,
                    net_foreign = excluded.net_foreign,
                    acc_dist_status = excluded.acc_dist_status,
                    acc_dist_score = excluded.acc_dist_score,
                    market_cap = excluded.market_cap,
                    volatility = excluded.volatility,
                    spread = excluded.spread,
                    momentum_index = excluded.momentum_index,
                    score = excluded.score,
                    passed_screen = excluded.passed_screen,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&r.symbol)
            .bind(&r.name)
            .bind(round2(r.price))
            .bind(round2(r.open_price))
            .bind(round2(r.high))
            .bind(round2(r.low))
            .bind(round2(r.prev_close))
            .bind(m.change)
            .bind(m.change_percent)
            .bind(r.volume)
            .bind(r.frequency)
            .bind(r.value)
            .bind(round2(r.bid))
            .bind(round2(r.ask))
            .bind(r.bid_size)
            .bind(r.ask_size)
            .bind(round2(r.iep))
            .bind(r.iev)
            .bind(m.bands.ara)
            .bind(m.bands.arb)
            .bind(m.bands.ara_pct)
            .bind(m.bands.arb_pct)
            .bind(r.foreign_buy)
            .bind(r.foreign_sell)
            .bind(m.net_foreign)
            .bind(m.acc_dist_status.to_string())
            .bind(m.acc_dist_score)
            .bind(m.market_cap)
            .bind(m.volatility)
            .bind(m.spread)
            .bind(row.momentum_index)
            .bind(row.score)
            .bind(row.passed)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Single-row session state, keyed by a constant id.
    pub async fn upsert_market_status(&self, session: &MarketSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO market_status (id, status, session, message, can_trade, should_update, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                session = excluded.session,
                message = excluded.message,
                can_trade = excluded.can_trade,
                should_update = excluded.should_update,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(MARKET_STATUS_ROW_ID)
        .bind(session.status.to_string())
        .bind(session.session.to_string())
        .bind(&session.message)
        .bind(session.can_trade)
        .bind(session.should_update)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Highest-scoring rows that passed the screen.
    pub async fn top_candidates(&self, limit: i64) -> Result<Vec<CandidateRow>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT symbol, name, price, change_percent, volume, volatility, net_foreign,
                   acc_dist_status, momentum_index, score, passed_screen
            FROM stocks
            WHERE passed_screen = 1
            ORDER BY score DESC, symbol ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn market_status(&self) -> Result<Option<MarketStatusRow>> {
        let row = sqlx::query_as::<_, MarketStatusRow>(
            "SELECT id, status, session, message, can_trade, should_update, updated_at FROM market_status WHERE id = ?",
        )
        .bind(MARKET_STATUS_ROW_ID)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
