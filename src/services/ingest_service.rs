use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{earnings_queries, news_queries, price_queries, watchlist_queries};
use crate::errors::AppError;
use crate::external::market_provider::{FetchPeriod, MarketDataProvider};

/// News items fetched per ticker on a refresh.
const NEWS_FETCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: String,
}

/// Outcome of a batch refresh. One ticker's provider failure never aborts
/// the rest; failures are collected here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub succeeded: usize,
    pub failed: usize,
    pub rows: u64,
    pub errors: Vec<TickerFailure>,
}

/// Pulls from the market-data provider and upserts into the store.
/// Network calls always happen outside the write transaction, so slow
/// providers never block concurrent writers.
pub struct IngestService {
    pool: SqlitePool,
    provider: Arc<dyn MarketDataProvider>,
}

impl IngestService {
    pub fn new(pool: SqlitePool, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { pool, provider }
    }

    async fn target_tickers(&self, ticker: Option<&str>) -> Result<Vec<String>, AppError> {
        match ticker {
            Some(t) => Ok(vec![t.to_uppercase()]),
            None => Ok(watchlist_queries::all_tickers(&self.pool).await?),
        }
    }

    /// Fetch and upsert price bars. Idempotent: unchanged provider data
    /// leaves the prices table unchanged.
    pub async fn update_prices(
        &self,
        ticker: Option<&str>,
        period: FetchPeriod,
    ) -> Result<RefreshReport, AppError> {
        let tickers = self.target_tickers(ticker).await?;
        let mut report = RefreshReport::default();

        for ticker in &tickers {
            match self.provider.fetch_prices(ticker, period).await {
                Ok(bars) => {
                    let mut tx = self.pool.begin().await?;
                    let rows = price_queries::upsert_bars(&mut tx, &bars).await?;
                    tx.commit().await?;
                    info!("{}: upserted {} price rows", ticker, rows);
                    report.rows += rows;
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!("{}: price fetch failed: {}", ticker, e);
                    report.failed += 1;
                    report.errors.push(TickerFailure {
                        ticker: ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Fetch and store news; duplicates by (ticker, url) are dropped, so
    /// `rows` counts genuinely new items.
    pub async fn update_news(&self, ticker: Option<&str>) -> Result<RefreshReport, AppError> {
        let tickers = self.target_tickers(ticker).await?;
        let mut report = RefreshReport::default();

        for ticker in &tickers {
            match self.provider.fetch_news(ticker, NEWS_FETCH_LIMIT).await {
                Ok(items) => {
                    let mut tx = self.pool.begin().await?;
                    let rows = news_queries::insert_items(&mut tx, &items).await?;
                    tx.commit().await?;
                    info!("{}: stored {} new articles", ticker, rows);
                    report.rows += rows;
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!("{}: news fetch failed: {}", ticker, e);
                    report.failed += 1;
                    report.errors.push(TickerFailure {
                        ticker: ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Refresh the earnings calendar; rows upsert on (ticker,
    /// fiscal_period) as estimates firm up.
    pub async fn refresh_earnings(&self, ticker: Option<&str>) -> Result<RefreshReport, AppError> {
        let tickers = self.target_tickers(ticker).await?;
        let mut report = RefreshReport::default();

        for ticker in &tickers {
            match self.provider.fetch_earnings(ticker).await {
                Ok(events) => {
                    let mut tx = self.pool.begin().await?;
                    for event in &events {
                        earnings_queries::upsert_event(&mut *tx, event).await?;
                    }
                    tx.commit().await?;
                    report.rows += events.len() as u64;
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!("{}: earnings fetch failed: {}", ticker, e);
                    report.failed += 1;
                    report.errors.push(TickerFailure {
                        ticker: ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
