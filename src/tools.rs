use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{
    earnings_queries, news_queries, price_queries, recommendation_queries, signal_queries,
    trade_queries, watchlist_queries,
};
use crate::errors::AppError;
use crate::external::market_provider::FetchPeriod;
use crate::models::{
    EarningsCalendarEntry, NewsItem, Recommendation, Sentiment, Signal, Stance, TickerSummary,
    Trade, TradeAction, WatchlistEntry, WatchlistEntryWithPrice,
};
use crate::services::aggregator_service::{self, Aggregator};
use crate::services::ingest_service::{IngestService, RefreshReport};
use crate::state::AppState;

const MAX_TICKER_LEN: usize = 10;
const TRADE_HISTORY_LIMIT: i64 = 100;
const RECOMMENDATION_HISTORY_LIMIT: i64 = 20;

fn default_days_ahead() -> i64 {
    14
}

fn default_news_count() -> i64 {
    10
}

/// The complete operation catalog. Adding an operation means adding a
/// variant here and a match arm in `dispatch`; there is no dynamic
/// registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", content = "params", rename_all = "snake_case")]
pub enum ToolCall {
    GetWatchlist,
    GetTickerSummary {
        ticker: String,
    },
    GetEarningsCalendar {
        #[serde(default = "default_days_ahead")]
        days_ahead: i64,
    },
    GetSignals {
        ticker: String,
    },
    GetRecentNews {
        ticker: String,
        #[serde(default = "default_news_count")]
        count: i64,
    },
    GetOpenTrades,
    GetTradeHistory {
        #[serde(default)]
        ticker: Option<String>,
    },
    GetRecommendations {
        #[serde(default)]
        ticker: Option<String>,
    },
    AddToWatchlist {
        ticker: String,
        stance: Stance,
        #[serde(default)]
        notes: Option<String>,
    },
    RemoveFromWatchlist {
        ticker: String,
    },
    UpdateStance {
        ticker: String,
        new_stance: Stance,
    },
    LogTrade {
        ticker: String,
        action: TradeAction,
        price: f64,
        shares: i64,
        thesis: String,
    },
    CloseTrade {
        trade_id: i64,
        exit_price: f64,
        #[serde(default)]
        closed_at: Option<DateTime<Utc>>,
    },
    AddSignal {
        ticker: String,
        source: String,
        value: f64,
        #[serde(default)]
        sentiment: Option<Sentiment>,
    },
    UpdatePrices {
        #[serde(default)]
        ticker: Option<String>,
        #[serde(default)]
        period: FetchPeriod,
    },
    UpdateNews {
        #[serde(default)]
        ticker: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Watchlist(Vec<WatchlistEntryWithPrice>),
    Summary(Box<TickerSummary>),
    Calendar(Vec<EarningsCalendarEntry>),
    Signals(Vec<Signal>),
    News(Vec<NewsItem>),
    Trades(Vec<Trade>),
    Recommendations(Vec<Recommendation>),
    Entry(WatchlistEntry),
    Trade(Trade),
    Signal(Signal),
    Refresh(RefreshReport),
    Removed(RemovalResult),
}

/// Outcome of a watchlist removal. Dependent rows in other tables are
/// retained and stay reachable through the raw summary path.
#[derive(Debug, Serialize)]
pub struct RemovalResult {
    pub ticker: String,
    pub removed: u64,
}

/// Trim, uppercase and validate a ticker symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("ticker must not be empty".into()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(AppError::Validation(format!(
            "ticker {ticker} exceeds {MAX_TICKER_LEN} characters"
        )));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(AppError::Validation(format!(
            "ticker {ticker} contains invalid characters"
        )));
    }
    Ok(ticker)
}

fn normalize_opt_ticker(raw: Option<&str>) -> Result<Option<String>, AppError> {
    raw.map(normalize_ticker).transpose()
}

/// Execute one operation. Reads run against the pool directly; every
/// write runs inside a transaction so a failed call leaves no partial
/// rows behind.
pub async fn dispatch(state: &AppState, call: ToolCall) -> Result<ToolOutput, AppError> {
    match call {
        ToolCall::GetWatchlist => {
            let entries = watchlist_queries::list_entries(&state.pool).await?;
            let today = Utc::now().date_naive();
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                let bar = price_queries::latest_bar(&state.pool, &entry.ticker, today).await?;
                out.push(WatchlistEntryWithPrice {
                    entry,
                    latest_close: bar.as_ref().map(|b| b.close),
                    latest_price_date: bar.map(|b| b.date),
                });
            }
            Ok(ToolOutput::Watchlist(out))
        }

        ToolCall::GetTickerSummary { ticker } => {
            let ticker = normalize_ticker(&ticker)?;
            let summary = Aggregator::new(state.pool.clone())
                .summarize(&ticker, None)
                .await?;
            Ok(ToolOutput::Summary(Box::new(summary)))
        }

        ToolCall::GetEarningsCalendar { days_ahead } => {
            if days_ahead < 0 {
                return Err(AppError::Validation(
                    "days_ahead must not be negative".into(),
                ));
            }
            let today = Utc::now().date_naive();
            let calendar = earnings_queries::calendar(&state.pool, today, days_ahead).await?;
            Ok(ToolOutput::Calendar(calendar))
        }

        ToolCall::GetSignals { ticker } => {
            let ticker = normalize_ticker(&ticker)?;
            let signals = signal_queries::recent_signals(
                &state.pool,
                &ticker,
                Utc::now(),
                aggregator_service::SIGNAL_WINDOW_DAYS,
                aggregator_service::SIGNALS_PER_SOURCE,
            )
            .await?;
            Ok(ToolOutput::Signals(signals))
        }

        ToolCall::GetRecentNews { ticker, count } => {
            let ticker = normalize_ticker(&ticker)?;
            if count <= 0 {
                return Err(AppError::Validation("count must be positive".into()));
            }
            let news = news_queries::recent_news(
                &state.pool,
                &ticker,
                Utc::now(),
                aggregator_service::NEWS_WINDOW_DAYS,
                count,
            )
            .await?;
            Ok(ToolOutput::News(news))
        }

        ToolCall::GetOpenTrades => {
            let trades = trade_queries::open_trades(&state.pool, None).await?;
            Ok(ToolOutput::Trades(trades))
        }

        ToolCall::GetTradeHistory { ticker } => {
            let ticker = normalize_opt_ticker(ticker.as_deref())?;
            let trades =
                trade_queries::trade_history(&state.pool, ticker.as_deref(), TRADE_HISTORY_LIMIT)
                    .await?;
            Ok(ToolOutput::Trades(trades))
        }

        ToolCall::GetRecommendations { ticker } => {
            let recs = match normalize_opt_ticker(ticker.as_deref())? {
                Some(ticker) => {
                    recommendation_queries::history(
                        &state.pool,
                        &ticker,
                        RECOMMENDATION_HISTORY_LIMIT,
                    )
                    .await?
                }
                None => recommendation_queries::latest_per_ticker(&state.pool).await?,
            };
            Ok(ToolOutput::Recommendations(recs))
        }

        ToolCall::AddToWatchlist {
            ticker,
            stance,
            notes,
        } => {
            let ticker = normalize_ticker(&ticker)?;
            let mut tx = state.pool.begin().await?;
            let entry =
                watchlist_queries::upsert_entry(&mut tx, &ticker, stance, notes.as_deref(), Utc::now())
                    .await?;
            tx.commit().await?;
            Ok(ToolOutput::Entry(entry))
        }

        ToolCall::RemoveFromWatchlist { ticker } => {
            let ticker = normalize_ticker(&ticker)?;
            let mut tx = state.pool.begin().await?;
            let removed = watchlist_queries::delete_entry(&mut *tx, &ticker).await?;
            if removed == 0 {
                return Err(AppError::NotFound(format!(
                    "{ticker} is not on the watchlist"
                )));
            }
            tx.commit().await?;
            Ok(ToolOutput::Removed(RemovalResult { ticker, removed }))
        }

        ToolCall::UpdateStance { ticker, new_stance } => {
            let ticker = normalize_ticker(&ticker)?;
            let mut tx = state.pool.begin().await?;
            let entry = watchlist_queries::set_stance(&mut tx, &ticker, new_stance, Utc::now())
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{ticker} is not on the watchlist")))?;
            tx.commit().await?;
            Ok(ToolOutput::Entry(entry))
        }

        ToolCall::LogTrade {
            ticker,
            action,
            price,
            shares,
            thesis,
        } => {
            let ticker = normalize_ticker(&ticker)?;
            // !(x > 0.0) rather than x <= 0.0 so NaN is rejected too
            if !(price > 0.0) {
                return Err(AppError::Validation("price must be positive".into()));
            }
            if shares <= 0 {
                return Err(AppError::Validation("shares must be positive".into()));
            }
            if thesis.trim().is_empty() {
                return Err(AppError::Validation("thesis must not be empty".into()));
            }
            let mut tx = state.pool.begin().await?;
            let trade = trade_queries::insert_trade(
                &mut *tx,
                &ticker,
                action,
                price,
                shares,
                thesis.trim(),
                Utc::now(),
            )
            .await?;
            tx.commit().await?;
            Ok(ToolOutput::Trade(trade))
        }

        ToolCall::CloseTrade {
            trade_id,
            exit_price,
            closed_at,
        } => {
            if !(exit_price > 0.0) {
                return Err(AppError::Validation("exit_price must be positive".into()));
            }
            let closed_at = closed_at.unwrap_or_else(Utc::now);
            let mut tx = state.pool.begin().await?;
            match trade_queries::close_trade(&mut *tx, trade_id, exit_price, closed_at).await? {
                Some(trade) => {
                    tx.commit().await?;
                    Ok(ToolOutput::Trade(trade))
                }
                // nothing closed: distinguish already-closed from missing
                None => match trade_queries::get_trade(&mut *tx, trade_id).await? {
                    Some(_) => Err(AppError::InvalidState(format!(
                        "trade {trade_id} is already closed"
                    ))),
                    None => Err(AppError::NotFound(format!("trade {trade_id} not found"))),
                },
            }
        }

        ToolCall::AddSignal {
            ticker,
            source,
            value,
            sentiment,
        } => {
            let ticker = normalize_ticker(&ticker)?;
            let source = source.trim().to_lowercase();
            if source.is_empty() {
                return Err(AppError::Validation("source must not be empty".into()));
            }
            if !value.is_finite() {
                return Err(AppError::Validation("value must be a finite number".into()));
            }
            let mut tx = state.pool.begin().await?;
            let signal =
                signal_queries::insert_signal(&mut *tx, &ticker, &source, value, sentiment, Utc::now())
                    .await?;
            tx.commit().await?;
            Ok(ToolOutput::Signal(signal))
        }

        ToolCall::UpdatePrices { ticker, period } => {
            let ticker = normalize_opt_ticker(ticker.as_deref())?;
            let ingest = IngestService::new(state.pool.clone(), state.provider.clone());
            let report = ingest.update_prices(ticker.as_deref(), period).await?;
            Ok(ToolOutput::Refresh(report))
        }

        ToolCall::UpdateNews { ticker } => {
            let ticker = normalize_opt_ticker(ticker.as_deref())?;
            let ingest = IngestService::new(state.pool.clone(), state.provider.clone());
            let report = ingest.update_news(ticker.as_deref()).await?;
            Ok(ToolOutput::Refresh(report))
        }
    }
}
