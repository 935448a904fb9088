use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;

use trader_backend::app;
use trader_backend::external::yahoo::YahooProvider;
use trader_backend::logging::{init_logging, LoggingConfig};
use trader_backend::services::job_scheduler_service::{JobContext, JobSchedulerService};
use trader_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://trader.db?mode=rwc".to_string());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .with_context(|| format!("connecting to {database_url}"))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let provider = Arc::new(YahooProvider::new());

    let brief_dir =
        PathBuf::from(std::env::var("BRIEF_DIR").unwrap_or_else(|_| "briefs".to_string()));
    let mut scheduler = JobSchedulerService::new(JobContext {
        pool: pool.clone(),
        provider: provider.clone(),
        brief_dir,
    })
    .await?;
    scheduler.start().await?;

    let state = AppState { pool, provider };
    let app = app::create_app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("🚀 Trader backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
