use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

/// A third-party or manual score/sentiment datum. Signals are an
/// append-only time series; "latest" is a query, not a storage rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Signal {
    pub ticker: String,
    pub source: String,
    pub value: f64,
    pub sentiment: Option<Sentiment>,
    pub observed_at: DateTime<Utc>,
}
