use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only news record, deduplicated by (ticker, url).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NewsItem {
    pub ticker: String,
    pub headline: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}
