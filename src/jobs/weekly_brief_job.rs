use chrono::Utc;
use tracing::{info, warn};

use crate::db::{earnings_queries, recommendation_queries, watchlist_queries};
use crate::errors::AppError;
use crate::external::market_provider::FetchPeriod;
use crate::services::aggregator_service::Aggregator;
use crate::services::brief_service;
use crate::services::ingest_service::IngestService;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::recommendation_service;

const CALENDAR_DAYS_AHEAD: i64 = 14;
const HISTORY_LOOKBACK: i64 = 5;

/// Sunday evening run: refresh data best-effort, regenerate one
/// recommendation per watchlist ticker, then write the markdown brief to
/// the brief directory as `YYYY-MM-DD-weekly.md`.
pub async fn run_weekly_brief(context: JobContext) -> Result<JobResult, AppError> {
    info!("📝 Weekly brief starting");
    let ingest = IngestService::new(context.pool.clone(), context.provider.clone());

    // Stale data still makes a useful brief, so refresh failures only warn
    if let Err(e) = ingest.update_prices(None, FetchPeriod::OneMonth).await {
        warn!("weekly price refresh failed: {}", e);
    }
    if let Err(e) = ingest.update_news(None).await {
        warn!("weekly news refresh failed: {}", e);
    }

    let entries = watchlist_queries::list_entries(&context.pool).await?;
    let aggregator = Aggregator::new(context.pool.clone());

    let mut recommendations = Vec::with_capacity(entries.len());
    let mut failed = 0usize;
    for entry in &entries {
        let summary = match aggregator.summarize(&entry.ticker, None).await {
            Ok(s) => s,
            Err(e) => {
                warn!("{}: summary failed, skipping: {}", entry.ticker, e);
                failed += 1;
                continue;
            }
        };
        let history =
            recommendation_queries::history(&context.pool, &entry.ticker, HISTORY_LOOKBACK).await?;
        let rec = recommendation_service::recommend(&summary, &history);

        let mut tx = context.pool.begin().await?;
        recommendation_queries::insert_recommendation(&mut *tx, &rec).await?;
        tx.commit().await?;
        recommendations.push(rec);
    }

    let today = Utc::now().date_naive();
    let calendar =
        earnings_queries::calendar(&context.pool, today, CALENDAR_DAYS_AHEAD).await?;

    let brief = brief_service::render_weekly_brief(today, &entries, &recommendations, &calendar);
    let path = context
        .brief_dir
        .join(format!("{}-weekly.md", today.format("%Y-%m-%d")));
    tokio::fs::create_dir_all(&context.brief_dir).await?;
    tokio::fs::write(&path, brief).await?;
    info!("📝 Weekly brief written to {}", path.display());

    Ok(JobResult {
        items_processed: recommendations.len(),
        items_failed: failed,
    })
}
