mod earnings;
mod news;
mod price;
mod recommendation;
mod signal;
mod summary;
mod trade;
mod watchlist;

pub use earnings::{EarningsCalendarEntry, EarningsEvent};
pub use news::NewsItem;
pub use price::PriceBar;
pub use recommendation::Recommendation;
pub use signal::{Sentiment, Signal};
pub use summary::TickerSummary;
pub use trade::{Trade, TradeAction};
pub use watchlist::{Stance, StanceChange, WatchlistEntry, WatchlistEntryWithPrice};
