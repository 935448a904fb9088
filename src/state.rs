use std::sync::Arc;

use sqlx::SqlitePool;

use crate::external::market_provider::MarketDataProvider;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub provider: Arc<dyn MarketDataProvider>,
}
