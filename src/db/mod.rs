pub mod models;
pub mod writer;

pub use writer::{PersistReport, StockWriter};

/// Migrated single-connection in-memory store for tests.
#[cfg(test)]
pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
    // One connection: every `:memory:` connection is its own database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
