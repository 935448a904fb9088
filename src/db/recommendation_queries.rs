use sqlx::SqliteExecutor;

use crate::models::Recommendation;

/// Append a generated recommendation to the decision history. No upsert:
/// prior decisions are never overwritten.
pub async fn insert_recommendation(
    executor: impl SqliteExecutor<'_>,
    rec: &Recommendation,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recommendations
            (ticker, generated_at, suggested_stance, confidence, rationale, inputs_snapshot)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rec.ticker)
    .bind(rec.generated_at)
    .bind(rec.suggested_stance)
    .bind(rec.confidence)
    .bind(&rec.rationale)
    .bind(&rec.inputs_snapshot)
    .execute(executor)
    .await?;
    Ok(())
}

/// Decision history for one ticker, newest first.
pub async fn history(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    limit: i64,
) -> Result<Vec<Recommendation>, sqlx::Error> {
    sqlx::query_as::<_, Recommendation>(
        r#"
        SELECT ticker, generated_at, suggested_stance, confidence, rationale, inputs_snapshot
        FROM recommendations
        WHERE ticker = ?
        ORDER BY generated_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Latest recommendation per watchlist ticker, most confident first.
pub async fn latest_per_ticker(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<Recommendation>, sqlx::Error> {
    sqlx::query_as::<_, Recommendation>(
        r#"
        SELECT r.ticker, r.generated_at, r.suggested_stance, r.confidence,
               r.rationale, r.inputs_snapshot
        FROM recommendations r
        JOIN watchlist w ON w.ticker = r.ticker
        WHERE r.id = (
            SELECT id FROM recommendations
            WHERE ticker = r.ticker
            ORDER BY generated_at DESC, id DESC
            LIMIT 1
        )
        ORDER BY r.confidence DESC
        "#,
    )
    .fetch_all(executor)
    .await
}
