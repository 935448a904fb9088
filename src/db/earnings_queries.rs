use chrono::NaiveDate;
use sqlx::{FromRow, SqliteExecutor};

use crate::models::{EarningsCalendarEntry, EarningsEvent, Stance};

/// Upsert keyed on (ticker, fiscal_period); estimates and actuals firm up
/// over successive refreshes.
pub async fn upsert_event(
    executor: impl SqliteExecutor<'_>,
    event: &EarningsEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO earnings (ticker, fiscal_period, report_date, estimate_eps,
                              actual_eps, estimate_rev, actual_rev)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(ticker, fiscal_period) DO UPDATE SET
            report_date = excluded.report_date,
            estimate_eps = COALESCE(excluded.estimate_eps, earnings.estimate_eps),
            actual_eps = COALESCE(excluded.actual_eps, earnings.actual_eps),
            estimate_rev = COALESCE(excluded.estimate_rev, earnings.estimate_rev),
            actual_rev = COALESCE(excluded.actual_rev, earnings.actual_rev)
        "#,
    )
    .bind(&event.ticker)
    .bind(&event.fiscal_period)
    .bind(event.report_date)
    .bind(event.estimate_eps)
    .bind(event.actual_eps)
    .bind(event.estimate_rev)
    .bind(event.actual_rev)
    .execute(executor)
    .await?;
    Ok(())
}

/// Next scheduled event with report_date >= `as_of`.
pub async fn next_on_or_after(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    as_of: NaiveDate,
) -> Result<Option<EarningsEvent>, sqlx::Error> {
    sqlx::query_as::<_, EarningsEvent>(
        r#"
        SELECT * FROM earnings
        WHERE ticker = ? AND report_date >= ?
        ORDER BY report_date ASC
        LIMIT 1
        "#,
    )
    .bind(ticker)
    .bind(as_of)
    .fetch_optional(executor)
    .await
}

/// Most recent event that already reported before `as_of`.
pub async fn last_before(
    executor: impl SqliteExecutor<'_>,
    ticker: &str,
    as_of: NaiveDate,
) -> Result<Option<EarningsEvent>, sqlx::Error> {
    sqlx::query_as::<_, EarningsEvent>(
        r#"
        SELECT * FROM earnings
        WHERE ticker = ? AND report_date < ?
        ORDER BY report_date DESC
        LIMIT 1
        "#,
    )
    .bind(ticker)
    .bind(as_of)
    .fetch_optional(executor)
    .await
}

#[derive(FromRow)]
struct CalendarRow {
    ticker: String,
    fiscal_period: String,
    report_date: NaiveDate,
    estimate_eps: Option<f64>,
    stance: Stance,
}

/// Upcoming not-yet-reported events for watchlist tickers within
/// `days_ahead` of `today`, soonest first.
pub async fn calendar(
    executor: impl SqliteExecutor<'_>,
    today: NaiveDate,
    days_ahead: i64,
) -> Result<Vec<EarningsCalendarEntry>, sqlx::Error> {
    let horizon = today + chrono::Duration::days(days_ahead);
    let rows = sqlx::query_as::<_, CalendarRow>(
        r#"
        SELECT e.ticker, e.fiscal_period, e.report_date, e.estimate_eps, w.stance
        FROM earnings e
        JOIN watchlist w ON w.ticker = e.ticker
        WHERE e.report_date >= ? AND e.report_date <= ? AND e.actual_eps IS NULL
        ORDER BY e.report_date ASC
        "#,
    )
    .bind(today)
    .bind(horizon)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| EarningsCalendarEntry {
            days_until: (r.report_date - today).num_days(),
            ticker: r.ticker,
            fiscal_period: r.fiscal_period,
            report_date: r.report_date,
            stance: r.stance,
            estimate_eps: r.estimate_eps,
        })
        .collect())
}
