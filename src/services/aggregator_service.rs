use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;

use crate::db::{
    earnings_queries, news_queries, price_queries, signal_queries, trade_queries,
    watchlist_queries,
};
use crate::errors::AppError;
use crate::models::TickerSummary;

/// Recency window and per-source cap applied to signals in a summary.
pub const SIGNAL_WINDOW_DAYS: i64 = 90;
pub const SIGNALS_PER_SOURCE: i64 = 5;

/// Recency window and cap applied to news in a summary.
pub const NEWS_WINDOW_DAYS: i64 = 14;
pub const NEWS_LIMIT: i64 = 10;

/// Snapshot reads are bounded-latency local queries; anything slower than
/// this indicates a wedged store, and the caller may simply retry.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Joins the per-ticker tables into a point-in-time `TickerSummary`.
/// Every sub-read of one summary runs inside a single transaction, so a
/// concurrent write can never straddle the snapshot.
pub struct Aggregator {
    pool: SqlitePool,
}

impl Aggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Summarize a watchlist ticker as of the given instant (now by
    /// default). Fails fast with `NotFound` for tickers that are not on
    /// the watchlist; sparse data degrades to empty fields, not errors.
    pub async fn summarize(
        &self,
        ticker: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<TickerSummary, AppError> {
        let ticker = ticker.to_uppercase();
        let as_of = as_of.unwrap_or_else(Utc::now);
        match tokio::time::timeout(SNAPSHOT_TIMEOUT, self.snapshot(&ticker, as_of, true)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        }
    }

    /// Audit bypass: same snapshot without the watchlist check, for
    /// inspecting orphan data left behind by a removed ticker. Not part
    /// of the recommendation path.
    pub async fn summarize_raw(
        &self,
        ticker: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<TickerSummary, AppError> {
        let ticker = ticker.to_uppercase();
        let as_of = as_of.unwrap_or_else(Utc::now);
        match tokio::time::timeout(SNAPSHOT_TIMEOUT, self.snapshot(&ticker, as_of, false)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        }
    }

    async fn snapshot(
        &self,
        ticker: &str,
        as_of: DateTime<Utc>,
        require_watchlist: bool,
    ) -> Result<TickerSummary, AppError> {
        let as_of_date = as_of.date_naive();
        let mut tx = self.pool.begin().await?;

        let entry = watchlist_queries::get_entry(&mut *tx, ticker).await?;
        if require_watchlist && entry.is_none() {
            return Err(AppError::NotFound(format!(
                "{ticker} is not on the watchlist"
            )));
        }

        let latest_price = price_queries::latest_bar(&mut *tx, ticker, as_of_date).await?;
        let open_trades = trade_queries::open_trades(&mut *tx, Some(ticker)).await?;
        let recent_signals = signal_queries::recent_signals(
            &mut *tx,
            ticker,
            as_of,
            SIGNAL_WINDOW_DAYS,
            SIGNALS_PER_SOURCE,
        )
        .await?;
        let next_earnings = earnings_queries::next_on_or_after(&mut *tx, ticker, as_of_date).await?;
        let last_reported_earnings =
            earnings_queries::last_before(&mut *tx, ticker, as_of_date).await?;
        let recent_news =
            news_queries::recent_news(&mut *tx, ticker, as_of, NEWS_WINDOW_DAYS, NEWS_LIMIT)
                .await?;

        tx.commit().await?;

        Ok(TickerSummary {
            ticker: ticker.to_string(),
            as_of,
            current_stance: entry.as_ref().map(|e| e.stance),
            notes: entry.and_then(|e| e.notes),
            latest_price,
            open_trades,
            recent_signals,
            next_earnings,
            last_reported_earnings,
            recent_news,
        })
    }
}
