#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use trader_backend::external::market_provider::{FetchPeriod, MarketDataProvider, ProviderError};
use trader_backend::models::{EarningsEvent, NewsItem, PriceBar};
use trader_backend::state::AppState;

/// Fresh in-memory store with the schema applied. One connection: each
/// `sqlite::memory:` connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

static DB_SEQ: AtomicU32 = AtomicU32::new(0);

/// File-backed store for tests that interleave connections; the in-memory
/// pool above is capped at one connection and would serialize everything.
pub async fn shared_test_pool() -> SqlitePool {
    let seq = DB_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("trader-test-{}-{}.db", std::process::id(), seq));
    let _ = std::fs::remove_file(&path);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// Canned market data keyed by ticker. Tickers in `failing` return
/// `ProviderError::Network` from every fetch.
#[derive(Default)]
pub struct StubProvider {
    pub prices: HashMap<String, Vec<PriceBar>>,
    pub news: HashMap<String, Vec<NewsItem>>,
    pub earnings: HashMap<String, Vec<EarningsEvent>>,
    pub failing: HashSet<String>,
}

impl StubProvider {
    fn check(&self, ticker: &str) -> Result<(), ProviderError> {
        if self.failing.contains(ticker) {
            return Err(ProviderError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn fetch_prices(
        &self,
        ticker: &str,
        _period: FetchPeriod,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        self.check(ticker)?;
        Ok(self.prices.get(ticker).cloned().unwrap_or_default())
    }

    async fn fetch_news(
        &self,
        ticker: &str,
        max_items: usize,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        self.check(ticker)?;
        let mut items = self.news.get(ticker).cloned().unwrap_or_default();
        items.truncate(max_items);
        Ok(items)
    }

    async fn fetch_earnings(&self, ticker: &str) -> Result<Vec<EarningsEvent>, ProviderError> {
        self.check(ticker)?;
        Ok(self.earnings.get(ticker).cloned().unwrap_or_default())
    }
}

pub async fn test_state(provider: StubProvider) -> AppState {
    AppState {
        pool: test_pool().await,
        provider: Arc::new(provider),
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn bar(ticker: &str, date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        ticker: ticker.into(),
        date,
        open: close - 2.0,
        high: close + 3.0,
        low: close - 4.0,
        close,
        volume: 1_000_000,
    }
}

pub fn news_item(ticker: &str, url: &str, published_at: DateTime<Utc>) -> NewsItem {
    NewsItem {
        ticker: ticker.into(),
        headline: format!("Story about {ticker}"),
        url: url.into(),
        source: "Newswire".into(),
        published_at,
    }
}
