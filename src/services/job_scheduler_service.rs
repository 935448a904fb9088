use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::errors::AppError;
use crate::external::market_provider::MarketDataProvider;
use crate::jobs::{daily_update_job, weekly_brief_job};

/// Context passed to job functions.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub provider: Arc<dyn MarketDataProvider>,
    pub brief_dir: PathBuf,
}

#[derive(Debug)]
pub struct JobResult {
    pub items_processed: usize,
    pub items_failed: usize,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .context("creating job scheduler")?;
        Ok(Self { scheduler, context })
    }

    /// Register and start all scheduled jobs.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        info!("🚀 Starting job scheduler...");

        // Test mode runs jobs every few minutes instead of on the real calendar
        let test_mode = std::env::var("JOB_SCHEDULER_TEST_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        if test_mode {
            info!("⚠️  JOB SCHEDULER IN TEST MODE - accelerated schedules!");
        }

        // format: sec min hour day month weekday
        let daily_schedule = if test_mode { "0 */2 * * * *" } else { "0 0 17 * * 1-5" };
        let daily_desc = if test_mode {
            "Every 2 minutes (TEST MODE)"
        } else {
            "Weekdays at 5:00 PM"
        };
        self.schedule_job(
            daily_schedule,
            "daily_update",
            daily_desc,
            daily_update_job::run_daily_update,
        )
        .await?;

        let weekly_schedule = if test_mode { "0 */5 * * * *" } else { "0 0 18 * * 0" };
        let weekly_desc = if test_mode {
            "Every 5 minutes (TEST MODE)"
        } else {
            "Sundays at 6:00 PM"
        };
        self.schedule_job(
            weekly_schedule,
            "weekly_brief",
            weekly_desc,
            weekly_brief_job::run_weekly_brief,
        )
        .await?;

        self.scheduler.start().await.context("starting scheduler")?;
        info!("✅ Job scheduler started");
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        name: &'static str,
        description: &str,
        run: F,
    ) -> anyhow::Result<()>
    where
        F: Fn(JobContext) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let context = context.clone();
            let run = run.clone();
            Box::pin(async move {
                info!("⏰ Running job: {}", name);
                match run(context).await {
                    Ok(result) => info!(
                        "✅ Job {} finished: {} processed, {} failed",
                        name, result.items_processed, result.items_failed
                    ),
                    Err(e) => error!("❌ Job {} failed: {}", name, e),
                }
            })
        })
        .with_context(|| format!("creating job {name}"))?;

        self.scheduler
            .add(job)
            .await
            .with_context(|| format!("registering job {name}"))?;

        info!("📅 Scheduled {}: {}", name, description);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await.context("stopping scheduler")?;
        Ok(())
    }
}
