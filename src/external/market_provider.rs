use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{EarningsEvent, NewsItem, PriceBar};

/// History window accepted by the provider, mirroring the ranges the
/// upstream APIs understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[default]
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl FetchPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPeriod::OneDay => "1d",
            FetchPeriod::FiveDays => "5d",
            FetchPeriod::OneMonth => "1mo",
            FetchPeriod::ThreeMonths => "3mo",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Provider(err.to_string())
    }
}

/// External data boundary. Implementations do all their network I/O here,
/// outside any store transaction, so ingestion never holds a write lock
/// across a slow call.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_prices(
        &self,
        ticker: &str,
        period: FetchPeriod,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    async fn fetch_news(
        &self,
        ticker: &str,
        max_items: usize,
    ) -> Result<Vec<NewsItem>, ProviderError>;

    async fn fetch_earnings(&self, ticker: &str) -> Result<Vec<EarningsEvent>, ProviderError>;
}
