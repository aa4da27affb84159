/// Row types read back from the store. Writes go through `writer.rs` binds.

#[derive(Debug, sqlx::FromRow)]
pub struct CandidateRow {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: f64,
    pub volume: i64,
    pub volatility: f64,
    pub net_foreign: i64,
    pub acc_dist_status: String,
    pub momentum_index: f64,
    pub score: i64,
    pub passed_screen: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct MarketStatusRow {
    pub id: i64,
    pub status: String,
    pub session: String,
    pub message: String,
    pub can_trade: bool,
    pub should_update: bool,
    pub updated_at: String,
}
