use tracing::info;

use crate::errors::AppError;
use crate::external::market_provider::FetchPeriod;
use crate::services::ingest_service::IngestService;
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Close-of-day refresh: recent price bars, fresh news and the earnings
/// calendar for every watchlist ticker. Per-ticker provider failures are
/// counted, not fatal.
pub async fn run_daily_update(context: JobContext) -> Result<JobResult, AppError> {
    info!("📊 Daily update starting");
    let ingest = IngestService::new(context.pool.clone(), context.provider.clone());

    let prices = ingest.update_prices(None, FetchPeriod::FiveDays).await?;
    let news = ingest.update_news(None).await?;
    let earnings = ingest.refresh_earnings(None).await?;

    info!(
        "📊 Daily update done: prices {}/{} ok, news {}/{} ok, earnings {}/{} ok",
        prices.succeeded,
        prices.succeeded + prices.failed,
        news.succeeded,
        news.succeeded + news.failed,
        earnings.succeeded,
        earnings.succeeded + earnings.failed,
    );

    Ok(JobResult {
        items_processed: prices.succeeded + news.succeeded + earnings.succeeded,
        items_failed: prices.failed + news.failed + earnings.failed,
    })
}
