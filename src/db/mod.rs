pub mod earnings_queries;
pub mod news_queries;
pub mod price_queries;
pub mod recommendation_queries;
pub mod signal_queries;
pub mod trade_queries;
pub mod watchlist_queries;
