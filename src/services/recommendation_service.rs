use serde_json::json;
use sqlx::types::Json;
use std::collections::HashSet;

use crate::models::{Recommendation, Sentiment, Stance, TickerSummary};

// ==============================================================================
// Rule table
// ==============================================================================

/// One contribution to the score. The table below is the whole strategy:
/// auditing a recommendation means reading this list, not the code.
pub struct Rule {
    pub name: &'static str,
    pub eval: fn(&TickerSummary) -> Option<RuleHit>,
}

pub struct RuleHit {
    pub delta: f64,
    pub note: String,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "signal_score",
        eval: signal_score,
    },
    Rule {
        name: "signal_sentiment",
        eval: signal_sentiment,
    },
    Rule {
        name: "eps_surprise",
        eval: eps_surprise,
    },
    Rule {
        name: "revenue_surprise",
        eval: revenue_surprise,
    },
    Rule {
        name: "price_vs_entry",
        eval: price_vs_entry,
    },
];

const NEUTRAL_SCORE: f64 = 5.0;
const BUY_THRESHOLD: f64 = 6.5;
const HOLD_THRESHOLD: f64 = 4.0;
const BASE_CONFIDENCE: f64 = 0.3;
const CONFIDENCE_PER_FACTOR: f64 = 0.15;
const MAX_CONFIDENCE: f64 = 0.95;

// ==============================================================================
// Engine
// ==============================================================================

/// Default scoring strategy. Pure function of its inputs: no I/O, no
/// clock reads — `generated_at` is the summary's `as_of`, preserving
/// traceability to the snapshot it was derived from. Missing fields skip
/// rules and lower confidence; they never abort generation.
///
/// `history` is the prior decision sequence, newest first.
pub fn recommend(summary: &TickerSummary, history: &[Recommendation]) -> Recommendation {
    let mut score = NEUTRAL_SCORE;
    let mut factors = Vec::new();

    for rule in RULES {
        if let Some(hit) = (rule.eval)(summary) {
            score += hit.delta;
            factors.push(hit.note);
        }
    }

    let suggested_stance = if score >= BUY_THRESHOLD {
        Stance::Buy
    } else if score >= HOLD_THRESHOLD {
        Stance::Hold
    } else {
        Stance::Sell
    };

    let mut confidence =
        (BASE_CONFIDENCE + factors.len() as f64 * CONFIDENCE_PER_FACTOR).min(MAX_CONFIDENCE);
    // agreement with the previous decision nudges confidence up
    if let Some(prev) = history.first() {
        if prev.suggested_stance == suggested_stance {
            confidence = (confidence + 0.05).min(MAX_CONFIDENCE);
        }
    }

    let inputs_snapshot = json!({
        "as_of": summary.as_of,
        "score": score,
        "factors": factors,
        "latest_close": summary.latest_price.as_ref().map(|b| b.close),
        "signal_count": summary.recent_signals.len(),
        "open_trade_count": summary.open_trades.len(),
        "current_stance": summary.current_stance,
    });

    let rationale = if factors.is_empty() {
        "Insufficient data".to_string()
    } else {
        factors.join("; ")
    };

    Recommendation {
        ticker: summary.ticker.clone(),
        generated_at: summary.as_of,
        suggested_stance,
        confidence,
        rationale,
        inputs_snapshot: Json(inputs_snapshot),
    }
}

// ==============================================================================
// Rules
// ==============================================================================

/// Average of the most recent score per source, on the 0-10 scale the
/// external providers use.
fn signal_score(summary: &TickerSummary) -> Option<RuleHit> {
    // recent_signals is newest-first, so the first hit per source wins
    let mut seen = HashSet::new();
    let mut latest = Vec::new();
    for signal in &summary.recent_signals {
        if seen.insert(signal.source.as_str()) {
            latest.push(signal.value);
        }
    }
    if latest.is_empty() {
        return None;
    }

    let avg = latest.iter().sum::<f64>() / latest.len() as f64;
    let (delta, label) = if avg >= 8.0 {
        (2.0, "Strong")
    } else if avg >= 6.0 {
        (1.0, "Good")
    } else if avg <= 3.0 {
        (-2.0, "Weak")
    } else if avg <= 5.0 {
        (-1.0, "Below-average")
    } else {
        return None;
    };

    Some(RuleHit {
        delta,
        note: format!("{label} external score (avg {avg:.1}/10)"),
    })
}

fn signal_sentiment(summary: &TickerSummary) -> Option<RuleHit> {
    let mut bullish = 0usize;
    let mut bearish = 0usize;
    for signal in &summary.recent_signals {
        match signal.sentiment {
            Some(Sentiment::Bullish) => bullish += 1,
            Some(Sentiment::Bearish) => bearish += 1,
            _ => {}
        }
    }
    if bullish == bearish {
        return None;
    }

    let (delta, skew) = if bullish > bearish {
        (0.5, "bullish")
    } else {
        (-0.5, "bearish")
    };
    Some(RuleHit {
        delta,
        note: format!("Signal sentiment skews {skew} ({bullish} bullish / {bearish} bearish)"),
    })
}

fn eps_surprise(summary: &TickerSummary) -> Option<RuleHit> {
    let pct = summary
        .last_reported_earnings
        .as_ref()
        .and_then(|e| e.eps_surprise_pct())?;
    if pct >= 5.0 {
        Some(RuleHit {
            delta: 1.0,
            note: format!("EPS beat last quarter (+{pct:.1}%)"),
        })
    } else if pct <= -5.0 {
        Some(RuleHit {
            delta: -1.0,
            note: format!("EPS miss last quarter ({pct:.1}%)"),
        })
    } else {
        None
    }
}

fn revenue_surprise(summary: &TickerSummary) -> Option<RuleHit> {
    let pct = summary
        .last_reported_earnings
        .as_ref()
        .and_then(|e| e.rev_surprise_pct())?;
    if pct >= 2.0 {
        Some(RuleHit {
            delta: 0.5,
            note: format!("Revenue beat last quarter (+{pct:.1}%)"),
        })
    } else if pct <= -2.0 {
        Some(RuleHit {
            delta: -0.5,
            note: format!("Revenue miss last quarter ({pct:.1}%)"),
        })
    } else {
        None
    }
}

/// Latest close against the average entry of open buy positions.
fn price_vs_entry(summary: &TickerSummary) -> Option<RuleHit> {
    let close = summary.latest_price.as_ref()?.close;
    let buys: Vec<_> = summary
        .open_trades
        .iter()
        .filter(|t| matches!(t.action, crate::models::TradeAction::Buy))
        .collect();
    if buys.is_empty() {
        return None;
    }

    let total_shares: i64 = buys.iter().map(|t| t.shares).sum();
    if total_shares == 0 {
        return None;
    }
    let avg_entry =
        buys.iter().map(|t| t.price * t.shares as f64).sum::<f64>() / total_shares as f64;
    if avg_entry <= 0.0 {
        return None;
    }

    let change_pct = (close - avg_entry) / avg_entry * 100.0;
    if change_pct >= 5.0 {
        Some(RuleHit {
            delta: 0.5,
            note: format!("Position up {change_pct:.1}% from entry"),
        })
    } else if change_pct <= -5.0 {
        Some(RuleHit {
            delta: -0.5,
            note: format!("Position down {:.1}% from entry", change_pct.abs()),
        })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EarningsEvent, PriceBar, Signal, Trade, TradeAction};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn empty_summary() -> TickerSummary {
        TickerSummary {
            ticker: "NVDA".into(),
            as_of: Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap(),
            current_stance: Some(Stance::Buy),
            notes: None,
            latest_price: None,
            open_trades: Vec::new(),
            recent_signals: Vec::new(),
            next_earnings: None,
            last_reported_earnings: None,
            recent_news: Vec::new(),
        }
    }

    fn signal(source: &str, value: f64, sentiment: Option<Sentiment>) -> Signal {
        Signal {
            ticker: "NVDA".into(),
            source: source.into(),
            value,
            sentiment,
            observed_at: Utc.with_ymd_and_hms(2026, 8, 26, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_summary_yields_low_confidence_hold() {
        let summary = empty_summary();
        let rec = recommend(&summary, &[]);
        assert_eq!(rec.suggested_stance, Stance::Hold);
        assert_eq!(rec.rationale, "Insufficient data");
        assert!((rec.confidence - 0.3).abs() < 1e-9);
        assert_eq!(rec.generated_at, summary.as_of);
    }

    #[test]
    fn strong_signals_produce_buy() {
        let mut summary = empty_summary();
        summary.recent_signals = vec![
            signal("danelfin", 9.0, Some(Sentiment::Bullish)),
            signal("toggle", 8.5, Some(Sentiment::Bullish)),
        ];
        let rec = recommend(&summary, &[]);
        assert_eq!(rec.suggested_stance, Stance::Buy);
        assert!(rec.rationale.contains("Strong external score"));
    }

    #[test]
    fn weak_signals_and_eps_miss_produce_sell() {
        let mut summary = empty_summary();
        summary.recent_signals = vec![signal("danelfin", 2.0, Some(Sentiment::Bearish))];
        summary.last_reported_earnings = Some(EarningsEvent {
            ticker: "NVDA".into(),
            fiscal_period: "Q2 2026".into(),
            report_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            estimate_eps: Some(1.0),
            actual_eps: Some(0.8),
            estimate_rev: None,
            actual_rev: None,
        });
        let rec = recommend(&summary, &[]);
        assert_eq!(rec.suggested_stance, Stance::Sell);
        assert!(rec.rationale.contains("EPS miss"));
    }

    #[test]
    fn only_latest_signal_per_source_is_scored() {
        let mut summary = empty_summary();
        // newest-first: the 9.0 should win over the stale 2.0 for danelfin
        summary.recent_signals = vec![signal("danelfin", 9.0, None), signal("danelfin", 2.0, None)];
        let rec = recommend(&summary, &[]);
        assert_eq!(rec.suggested_stance, Stance::Buy);
    }

    #[test]
    fn agreement_with_history_raises_confidence() {
        let mut summary = empty_summary();
        summary.recent_signals = vec![signal("danelfin", 9.0, None)];
        let first = recommend(&summary, &[]);
        let second = recommend(&summary, &[first.clone()]);
        assert_eq!(first.suggested_stance, second.suggested_stance);
        assert!(second.confidence > first.confidence);
    }

    #[test]
    fn position_momentum_contributes() {
        let mut summary = empty_summary();
        summary.latest_price = Some(PriceBar {
            ticker: "NVDA".into(),
            date: NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            open: 495.0,
            high: 505.0,
            low: 490.0,
            close: 500.0,
            volume: 1_000_000,
        });
        summary.open_trades = vec![Trade {
            id: 1,
            ticker: "NVDA".into(),
            action: TradeAction::Buy,
            price: 450.0,
            shares: 100,
            thesis: "AI demand".into(),
            opened_at: Utc.with_ymd_and_hms(2026, 7, 1, 14, 0, 0).unwrap(),
            closed_at: None,
            exit_price: None,
        }];
        let rec = recommend(&summary, &[]);
        assert!(rec.rationale.contains("Position up"));
    }

    #[test]
    fn rule_table_names_are_unique() {
        let names: std::collections::HashSet<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), RULES.len());
    }
}
