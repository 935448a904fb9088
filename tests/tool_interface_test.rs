mod common;

use common::{at, bar, day, news_item, test_state, StubProvider};

use trader_backend::db::watchlist_queries;
use trader_backend::errors::AppError;
use trader_backend::external::market_provider::FetchPeriod;
use trader_backend::models::{Sentiment, Stance, TradeAction};
use trader_backend::tools::{dispatch, ToolCall, ToolOutput};

async fn add(state: &trader_backend::state::AppState, ticker: &str, stance: Stance) {
    dispatch(
        state,
        ToolCall::AddToWatchlist {
            ticker: ticker.into(),
            stance,
            notes: None,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn end_to_end_research_flow() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "nvda", Stance::Buy).await;

    let out = dispatch(
        &state,
        ToolCall::LogTrade {
            ticker: "NVDA".into(),
            action: TradeAction::Buy,
            price: 450.0,
            shares: 100,
            thesis: "AI demand".into(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(out, ToolOutput::Trade(_)));

    dispatch(
        &state,
        ToolCall::AddSignal {
            ticker: "NVDA".into(),
            source: "danelfin".into(),
            value: 8.5,
            sentiment: Some(Sentiment::Bullish),
        },
    )
    .await
    .unwrap();

    let out = dispatch(
        &state,
        ToolCall::GetTickerSummary {
            ticker: "nvda".into(),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Summary(summary) = out else {
        panic!("expected summary");
    };
    assert_eq!(summary.ticker, "NVDA");
    assert_eq!(summary.current_stance, Some(Stance::Buy));
    assert_eq!(summary.open_trades.len(), 1);
    assert!(summary.open_trades[0].is_open());
    assert_eq!(summary.open_trades[0].shares, 100);
    assert_eq!(summary.open_trades[0].price, 450.0);
    assert_eq!(summary.recent_signals.len(), 1);
    assert_eq!(summary.recent_signals[0].source, "danelfin");
    assert_eq!(summary.recent_signals[0].value, 8.5);
    assert_eq!(
        summary.recent_signals[0].sentiment,
        Some(Sentiment::Bullish)
    );
}

#[tokio::test]
async fn summary_for_unknown_ticker_is_not_found() {
    let state = test_state(StubProvider::default()).await;
    let err = dispatch(
        &state,
        ToolCall::GetTickerSummary {
            ticker: "ZZZZ".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn new_ticker_summary_degrades_gracefully() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "AAPL", Stance::Watch).await;

    let out = dispatch(
        &state,
        ToolCall::GetTickerSummary {
            ticker: "AAPL".into(),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Summary(summary) = out else {
        panic!("expected summary");
    };
    assert_eq!(summary.current_stance, Some(Stance::Watch));
    assert!(summary.latest_price.is_none());
    assert!(summary.open_trades.is_empty());
    assert!(summary.recent_signals.is_empty());
    assert!(summary.next_earnings.is_none());
    assert!(summary.recent_news.is_empty());
}

#[tokio::test]
async fn close_trade_is_one_way() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "NVDA", Stance::Buy).await;

    let out = dispatch(
        &state,
        ToolCall::LogTrade {
            ticker: "NVDA".into(),
            action: TradeAction::Buy,
            price: 450.0,
            shares: 10,
            thesis: "entry".into(),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Trade(trade) = out else {
        panic!("expected trade");
    };

    let first_close = at(2026, 8, 20, 15);
    let out = dispatch(
        &state,
        ToolCall::CloseTrade {
            trade_id: trade.id,
            exit_price: 500.0,
            closed_at: Some(first_close),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Trade(closed) = out else {
        panic!("expected trade");
    };
    assert!(!closed.is_open());
    assert_eq!(closed.closed_at, Some(first_close));
    assert_eq!(closed.exit_price, Some(500.0));

    // second close fails and must not touch closed_at
    let err = dispatch(
        &state,
        ToolCall::CloseTrade {
            trade_id: trade.id,
            exit_price: 999.0,
            closed_at: Some(at(2026, 8, 21, 15)),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let out = dispatch(&state, ToolCall::GetTradeHistory { ticker: None })
        .await
        .unwrap();
    let ToolOutput::Trades(trades) = out else {
        panic!("expected trades");
    };
    assert_eq!(trades[0].closed_at, Some(first_close));
    assert_eq!(trades[0].exit_price, Some(500.0));
}

#[tokio::test]
async fn closing_missing_trade_is_not_found() {
    let state = test_state(StubProvider::default()).await;
    let err = dispatch(
        &state,
        ToolCall::CloseTrade {
            trade_id: 4242,
            exit_price: 10.0,
            closed_at: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn trade_validation_rejects_bad_input() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "NVDA", Stance::Buy).await;

    let err = dispatch(
        &state,
        ToolCall::LogTrade {
            ticker: "NVDA".into(),
            action: TradeAction::Buy,
            price: 450.0,
            shares: -5,
            thesis: "bad".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = dispatch(
        &state,
        ToolCall::LogTrade {
            ticker: "NVDA".into(),
            action: TradeAction::Buy,
            price: 0.0,
            shares: 5,
            thesis: "bad".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn stance_changes_leave_complete_audit_trail() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "NVDA", Stance::Buy).await;

    for stance in [Stance::Hold, Stance::Sell] {
        dispatch(
            &state,
            ToolCall::UpdateStance {
                ticker: "NVDA".into(),
                new_stance: stance,
            },
        )
        .await
        .unwrap();
    }

    let history = watchlist_queries::stance_history(&state.pool, "NVDA")
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].previous_stance, None);
    assert_eq!(history[0].stance, Stance::Buy);
    assert_eq!(history[1].previous_stance, Some(Stance::Buy));
    assert_eq!(history[1].stance, Stance::Hold);
    assert_eq!(history[2].previous_stance, Some(Stance::Hold));
    assert_eq!(history[2].stance, Stance::Sell);
    assert!(history[0].changed_at <= history[1].changed_at);
    assert!(history[1].changed_at <= history[2].changed_at);
}

#[tokio::test]
async fn update_stance_for_unknown_ticker_is_not_found() {
    let state = test_state(StubProvider::default()).await;
    let err = dispatch(
        &state,
        ToolCall::UpdateStance {
            ticker: "ZZZZ".into(),
            new_stance: Stance::Sell,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn batch_price_update_reports_partial_failure() {
    let mut provider = StubProvider::default();
    provider
        .prices
        .insert("NVDA".into(), vec![bar("NVDA", day(2026, 8, 25), 500.0)]);
    provider
        .prices
        .insert("AAPL".into(), vec![bar("AAPL", day(2026, 8, 25), 230.0)]);
    provider.failing.insert("MSFT".into());

    let state = test_state(provider).await;
    for ticker in ["NVDA", "AAPL", "MSFT"] {
        add(&state, ticker, Stance::Hold).await;
    }

    let out = dispatch(
        &state,
        ToolCall::UpdatePrices {
            ticker: None,
            period: FetchPeriod::FiveDays,
        },
    )
    .await
    .unwrap();
    let ToolOutput::Refresh(report) = out else {
        panic!("expected refresh report");
    };
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.rows, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].ticker, "MSFT");

    // the healthy tickers' data landed despite the failure
    let out = dispatch(&state, ToolCall::GetWatchlist).await.unwrap();
    let ToolOutput::Watchlist(entries) = out else {
        panic!("expected watchlist");
    };
    let nvda = entries.iter().find(|e| e.entry.ticker == "NVDA").unwrap();
    assert_eq!(nvda.latest_close, Some(500.0));
    let msft = entries.iter().find(|e| e.entry.ticker == "MSFT").unwrap();
    assert_eq!(msft.latest_close, None);
}

#[tokio::test]
async fn price_update_is_idempotent() {
    let mut provider = StubProvider::default();
    provider.prices.insert(
        "NVDA".into(),
        vec![
            bar("NVDA", day(2026, 8, 24), 495.0),
            bar("NVDA", day(2026, 8, 25), 500.0),
        ],
    );
    let state = test_state(provider).await;
    add(&state, "NVDA", Stance::Buy).await;

    let call = ToolCall::UpdatePrices {
        ticker: Some("NVDA".into()),
        period: FetchPeriod::FiveDays,
    };
    dispatch(&state, call.clone()).await.unwrap();
    dispatch(&state, call).await.unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prices WHERE ticker = 'NVDA'")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 2);

    let row: (f64,) =
        sqlx::query_as("SELECT close FROM prices WHERE ticker = 'NVDA' AND date = '2026-08-25'")
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(row.0, 500.0);
}

#[tokio::test]
async fn news_update_drops_duplicate_urls() {
    let mut provider = StubProvider::default();
    provider.news.insert(
        "NVDA".into(),
        vec![
            news_item("NVDA", "https://example.com/a", at(2026, 8, 25, 9)),
            news_item("NVDA", "https://example.com/b", at(2026, 8, 25, 10)),
        ],
    );
    let state = test_state(provider).await;
    add(&state, "NVDA", Stance::Buy).await;

    let call = ToolCall::UpdateNews {
        ticker: Some("NVDA".into()),
    };
    let out = dispatch(&state, call.clone()).await.unwrap();
    let ToolOutput::Refresh(report) = out else {
        panic!("expected refresh report");
    };
    assert_eq!(report.rows, 2);

    // second run inserts nothing new
    let out = dispatch(&state, call).await.unwrap();
    let ToolOutput::Refresh(report) = out else {
        panic!("expected refresh report");
    };
    assert_eq!(report.rows, 0);

    let out = dispatch(
        &state,
        ToolCall::GetRecentNews {
            ticker: "NVDA".into(),
            count: 10,
        },
    )
    .await
    .unwrap();
    let ToolOutput::News(items) = out else {
        panic!("expected news");
    };
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn re_adding_ticker_keeps_notes_and_updates_stance() {
    let state = test_state(StubProvider::default()).await;
    let out = dispatch(
        &state,
        ToolCall::AddToWatchlist {
            ticker: "NVDA".into(),
            stance: Stance::Watch,
            notes: Some("GPU cycle".into()),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Entry(first) = out else {
        panic!("expected entry");
    };

    // same stance: the stance timestamp must not move
    let out = dispatch(
        &state,
        ToolCall::AddToWatchlist {
            ticker: "NVDA".into(),
            stance: Stance::Watch,
            notes: None,
        },
    )
    .await
    .unwrap();
    let ToolOutput::Entry(same) = out else {
        panic!("expected entry");
    };
    assert_eq!(same.stance_updated_at, first.stance_updated_at);
    assert_eq!(same.notes.as_deref(), Some("GPU cycle"));

    let out = dispatch(
        &state,
        ToolCall::AddToWatchlist {
            ticker: "NVDA".into(),
            stance: Stance::Buy,
            notes: None,
        },
    )
    .await
    .unwrap();
    let ToolOutput::Entry(changed) = out else {
        panic!("expected entry");
    };
    assert_eq!(changed.stance, Stance::Buy);
    assert_eq!(changed.notes.as_deref(), Some("GPU cycle"));
    assert!(changed.stance_updated_at > first.stance_updated_at);

    // audit rows only for the add and the real change
    let history = watchlist_queries::stance_history(&state.pool, "NVDA")
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].previous_stance, Some(Stance::Watch));
    assert_eq!(history[1].stance, Stance::Buy);
}

#[tokio::test]
async fn remove_from_watchlist_hard_deletes_entry() {
    let state = test_state(StubProvider::default()).await;
    add(&state, "NVDA", Stance::Buy).await;

    let out = dispatch(
        &state,
        ToolCall::RemoveFromWatchlist {
            ticker: "nvda".into(),
        },
    )
    .await
    .unwrap();
    let ToolOutput::Removed(result) = out else {
        panic!("expected removal result");
    };
    assert_eq!(result.ticker, "NVDA");
    assert_eq!(result.removed, 1);

    let out = dispatch(&state, ToolCall::GetWatchlist).await.unwrap();
    let ToolOutput::Watchlist(entries) = out else {
        panic!("expected watchlist");
    };
    assert!(entries.is_empty());

    // the removed ticker is gone from the summarizable universe
    let err = dispatch(
        &state,
        ToolCall::GetTickerSummary {
            ticker: "NVDA".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // removing again reports the absence
    let err = dispatch(
        &state,
        ToolCall::RemoveFromWatchlist {
            ticker: "NVDA".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
