use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch data: {0}")]
    NoData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Why a single source call produced nothing. Never fatal on its own.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("source returned no rows")]
    Empty,
}

/// Record-level failure while resolving one symbol. The symbol is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("{symbol}: field `{field}` is not a finite number")]
    NonFinite { symbol: String, field: &'static str },

    #[error("{symbol}: volume {value} cannot be represented as a share count")]
    VolumeOutOfRange { symbol: String, value: f64 },
}
