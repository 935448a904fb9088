use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::NewsItem;

/// Insert a batch, ignoring items already stored for the same
/// (ticker, url). Returns the number of rows actually inserted.
pub async fn insert_items(
    conn: &mut SqliteConnection,
    items: &[NewsItem],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for item in items {
        let result = sqlx::query(
            r#"
            INSERT INTO news (ticker, headline, url, source, published_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(ticker, url) DO NOTHING
            "#,
        )
        .bind(&item.ticker)
        .bind(&item.headline)
        .bind(&item.url)
        .bind(&item.source)
        .bind(item.published_at)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// Items published within the window ending at `as_of`, newest first,
/// capped at `limit`.
pub async fn recent_news(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    as_of: DateTime<Utc>,
    window_days: i64,
    limit: i64,
) -> Result<Vec<NewsItem>, sqlx::Error> {
    let window_start = as_of - Duration::days(window_days);
    sqlx::query_as::<_, NewsItem>(
        r#"
        SELECT ticker, headline, url, source, published_at FROM news
        WHERE ticker = ? AND published_at <= ? AND published_at >= ?
        ORDER BY published_at DESC
        LIMIT ?
        "#,
    )
    .bind(ticker)
    .bind(as_of)
    .bind(window_start)
    .bind(limit)
    .fetch_all(executor)
    .await
}
