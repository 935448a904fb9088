use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// A journal entry. Open while `closed_at` is unset; closing is a one-way
/// transition, never reopened.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: i64,
    pub ticker: String,
    pub action: TradeAction,
    pub price: f64,
    pub shares: i64,
    pub thesis: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}
