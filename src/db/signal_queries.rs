use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteExecutor;

use crate::models::{Sentiment, Signal};

/// Append one observation. Signals are never overwritten; the same source
/// may report many times.
pub async fn insert_signal(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    source: &str,
    value: f64,
    sentiment: Option<Sentiment>,
    observed_at: DateTime<Utc>,
) -> Result<Signal, sqlx::Error> {
    sqlx::query_as::<_, Signal>(
        r#"
        INSERT INTO signals (ticker, source, value, sentiment, observed_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING ticker, source, value, sentiment, observed_at
        "#,
    )
    .bind(ticker)
    .bind(source)
    .bind(value)
    .bind(sentiment)
    .bind(observed_at)
    .fetch_one(executor)
    .await
}

/// Signals observed in the window ending at `as_of`, newest first, capped
/// per source to bound summary size.
pub async fn recent_signals(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    as_of: DateTime<Utc>,
    window_days: i64,
    per_source: i64,
) -> Result<Vec<Signal>, sqlx::Error> {
    let window_start = as_of - Duration::days(window_days);
    sqlx::query_as::<_, Signal>(
        r#"
        SELECT ticker, source, value, sentiment, observed_at FROM (
            SELECT s.*, ROW_NUMBER() OVER (
                PARTITION BY s.source ORDER BY s.observed_at DESC
            ) AS rn
            FROM signals s
            WHERE s.ticker = ? AND s.observed_at <= ? AND s.observed_at >= ?
        )
        WHERE rn <= ?
        ORDER BY observed_at DESC
        "#,
    )
    .bind(ticker)
    .bind(as_of)
    .bind(window_start)
    .bind(per_source)
    .fetch_all(executor)
    .await
}
