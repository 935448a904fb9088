use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::models::{Stance, StanceChange, WatchlistEntry};

// ==============================================================================
// Watchlist CRUD Operations
// ==============================================================================

pub async fn get_entry(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
) -> Result<Option<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist WHERE ticker = ?")
        .bind(ticker)
        .fetch_optional(executor)
        .await
}

pub async fn list_entries(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist ORDER BY ticker")
        .fetch_all(executor)
        .await
}

pub async fn all_tickers(executor: impl SqliteExecutor<'_>) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT ticker FROM watchlist ORDER BY ticker")
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Insert or refresh a watchlist entry. Writes the audit row for the
/// initial add and for any stance change caused by a re-add.
pub async fn upsert_entry(
    conn: &mut SqliteConnection,
    ticker: &str,
    stance: Stance,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<WatchlistEntry, sqlx::Error> {
    let existing = get_entry(&mut *conn, ticker).await?;

    let entry = sqlx::query_as::<_, WatchlistEntry>(
        r#"
        INSERT INTO watchlist (ticker, stance, notes, added_at, stance_updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(ticker) DO UPDATE SET
            stance = excluded.stance,
            notes = COALESCE(excluded.notes, watchlist.notes),
            stance_updated_at = CASE
                WHEN watchlist.stance = excluded.stance THEN watchlist.stance_updated_at
                ELSE excluded.stance_updated_at
            END
        RETURNING *
        "#,
    )
    .bind(ticker)
    .bind(stance)
    .bind(notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    match existing {
        Some(prev) if prev.stance == stance => {}
        other => {
            record_stance_change(conn, ticker, other.map(|e| e.stance), stance, now).await?;
        }
    }

    Ok(entry)
}

/// Conditional stance update; returns None when the ticker is not on the
/// watchlist. Must run inside the caller's transaction so the stance
/// column and the audit row commit together.
pub async fn set_stance(
    conn: &mut SqliteConnection,
    ticker: &str,
    new_stance: Stance,
    now: DateTime<Utc>,
) -> Result<Option<WatchlistEntry>, sqlx::Error> {
    let Some(current) = get_entry(&mut *conn, ticker).await? else {
        return Ok(None);
    };

    let entry = sqlx::query_as::<_, WatchlistEntry>(
        r#"
        UPDATE watchlist SET stance = ?, stance_updated_at = ?
        WHERE ticker = ?
        RETURNING *
        "#,
    )
    .bind(new_stance)
    .bind(now)
    .bind(ticker)
    .fetch_one(&mut *conn)
    .await?;

    if current.stance != new_stance {
        record_stance_change(conn, ticker, Some(current.stance), new_stance, now).await?;
    }

    Ok(Some(entry))
}

pub async fn delete_entry(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE ticker = ?")
        .bind(ticker)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

// ==============================================================================
// Stance Audit Trail
// ==============================================================================

async fn record_stance_change(
    conn: &mut SqliteConnection,
    ticker: &str,
    previous: Option<Stance>,
    stance: Stance,
    changed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stance_history (ticker, previous_stance, stance, changed_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(ticker)
    .bind(previous)
    .bind(stance)
    .bind(changed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn stance_history(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
) -> Result<Vec<StanceChange>, sqlx::Error> {
    sqlx::query_as::<_, StanceChange>(
        r#"
        SELECT ticker, previous_stance, stance, changed_at
        FROM stance_history
        WHERE ticker = ?
        ORDER BY changed_at ASC, id ASC
        "#,
    )
    .bind(ticker)
    .fetch_all(executor)
    .await
}
