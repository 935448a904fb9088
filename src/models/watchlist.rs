use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==============================================================================
// Watchlist Models
// ==============================================================================

/// Categorical investment posture for a tracked ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Stance {
    Buy,
    Hold,
    Sell,
    Watch,
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stance::Buy => "buy",
            Stance::Hold => "hold",
            Stance::Sell => "sell",
            Stance::Watch => "watch",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub stance: Stance,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
    pub stance_updated_at: DateTime<Utc>,
}

/// One row of the stance audit trail. `previous_stance` is None only for
/// the row written when the ticker was first added.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StanceChange {
    pub ticker: String,
    pub previous_stance: Option<Stance>,
    pub stance: Stance,
    pub changed_at: DateTime<Utc>,
}

/// Watchlist listing enriched with the most recent stored close.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntryWithPrice {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub latest_close: Option<f64>,
    pub latest_price_date: Option<NaiveDate>,
}
