use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{EarningsEvent, NewsItem, PriceBar, Signal, Stance, Trade};

/// Point-in-time join of everything known about one ticker. Derived,
/// never stored: computed fresh per request from a single store snapshot
/// so no field can reflect a half-applied write.
#[derive(Debug, Clone, Serialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub as_of: DateTime<Utc>,
    /// Absent only for the raw (non-watchlist) audit path.
    pub current_stance: Option<Stance>,
    pub notes: Option<String>,
    pub latest_price: Option<PriceBar>,
    pub open_trades: Vec<Trade>,
    pub recent_signals: Vec<Signal>,
    pub next_earnings: Option<EarningsEvent>,
    pub last_reported_earnings: Option<EarningsEvent>,
    pub recent_news: Vec<NewsItem>,
}
