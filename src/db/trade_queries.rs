use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::models::{Trade, TradeAction};

pub async fn insert_trade(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    action: TradeAction,
    price: f64,
    shares: i64,
    thesis: &str,
    opened_at: DateTime<Utc>,
) -> Result<Trade, sqlx::Error> {
    sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades (ticker, action, price, shares, thesis, opened_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(ticker)
    .bind(action)
    .bind(price)
    .bind(shares)
    .bind(thesis)
    .bind(opened_at)
    .fetch_one(executor)
    .await
}

pub async fn get_trade(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<Trade>, sqlx::Error> {
    sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Conditional close: only succeeds while the trade is still open.
/// Returns None when no open trade with this id exists, leaving the
/// caller to distinguish "already closed" from "missing".
pub async fn close_trade(
    executor: impl SqliteExecutor<'_>,
    id: i64,
    exit_price: f64,
    closed_at: DateTime<Utc>,
) -> Result<Option<Trade>, sqlx::Error> {
    sqlx::query_as::<_, Trade>(
        r#"
        UPDATE trades SET closed_at = ?, exit_price = ?
        WHERE id = ? AND closed_at IS NULL
        RETURNING *
        "#,
    )
    .bind(closed_at)
    .bind(exit_price)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn open_trades(
    executor: impl SqliteExecutor<'_>,
    ticker: Option<&str>,
) -> Result<Vec<Trade>, sqlx::Error> {
    match ticker {
        Some(ticker) => {
            sqlx::query_as::<_, Trade>(
                r#"
                SELECT * FROM trades
                WHERE ticker = ? AND closed_at IS NULL
                ORDER BY opened_at DESC
                "#,
            )
            .bind(ticker)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as::<_, Trade>(
                "SELECT * FROM trades WHERE closed_at IS NULL ORDER BY opened_at DESC",
            )
            .fetch_all(executor)
            .await
        }
    }
}

pub async fn trade_history(
    executor: impl SqliteExecutor<'_>,
    ticker: Option<&str>,
    limit: i64,
) -> Result<Vec<Trade>, sqlx::Error> {
    match ticker {
        Some(ticker) => {
            sqlx::query_as::<_, Trade>(
                r#"
                SELECT * FROM trades
                WHERE ticker = ?
                ORDER BY opened_at DESC
                LIMIT ?
                "#,
            )
            .bind(ticker)
            .bind(limit)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as::<_, Trade>("SELECT * FROM trades ORDER BY opened_at DESC LIMIT ?")
                .bind(limit)
                .fetch_all(executor)
                .await
        }
    }
}
