use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::PriceBar;

/// Upsert a batch of bars keyed on (ticker, date). Idempotent: re-running
/// with the same bars leaves the table unchanged.
pub async fn upsert_bars(
    conn: &mut SqliteConnection,
    bars: &[PriceBar],
) -> Result<u64, sqlx::Error> {
    let mut rows = 0;
    for bar in bars {
        let result = sqlx::query(
            r#"
            INSERT INTO prices (ticker, date, open, high, low, close, volume)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ticker, date) DO UPDATE SET
                open = excluded.open,
                high = excluded.high,
                low = excluded.low,
                close = excluded.close,
                volume = excluded.volume
            "#,
        )
        .bind(&bar.ticker)
        .bind(bar.date)
        .bind(bar.open)
        .bind(bar.high)
        .bind(bar.low)
        .bind(bar.close)
        .bind(bar.volume)
        .execute(&mut *conn)
        .await?;
        rows += result.rows_affected();
    }
    Ok(rows)
}

/// Most recent bar with date <= `on_or_before`.
pub async fn latest_bar(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    on_or_before: NaiveDate,
) -> Result<Option<PriceBar>, sqlx::Error> {
    sqlx::query_as::<_, PriceBar>(
        r#"
        SELECT * FROM prices
        WHERE ticker = ? AND date <= ?
        ORDER BY date DESC
        LIMIT 1
        "#,
    )
    .bind(ticker)
    .bind(on_or_before)
    .fetch_optional(executor)
    .await
}
