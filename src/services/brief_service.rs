use chrono::{Duration, NaiveDate};

use crate::models::{EarningsCalendarEntry, Recommendation, Stance, WatchlistEntry};

/// Render the weekly brief markdown. Pure function of its inputs: the
/// caller gathers the data and writes the file.
pub fn render_weekly_brief(
    today: NaiveDate,
    entries: &[WatchlistEntry],
    recommendations: &[Recommendation],
    calendar: &[EarningsCalendarEntry],
) -> String {
    let week_earnings: Vec<_> = calendar.iter().filter(|e| e.days_until <= 7).collect();

    let mut lines: Vec<String> = vec![
        format!("# Weekly Brief - {}", today.format("%B %d, %Y")),
        String::new(),
        "---".into(),
        String::new(),
        "## Summary".into(),
        String::new(),
        format!("- **Watchlist**: {} tickers", entries.len()),
        format!("- **Earnings this week**: {}", week_earnings.len()),
        String::new(),
    ];

    // Recommendation breakdown
    let count_of = |stance: Stance| {
        recommendations
            .iter()
            .filter(|r| r.suggested_stance == stance)
            .count()
    };
    lines.extend([
        "### Recommendations Breakdown".into(),
        String::new(),
        format!("- Buy: {}", count_of(Stance::Buy)),
        format!("- Hold: {}", count_of(Stance::Hold)),
        format!("- Sell: {}", count_of(Stance::Sell)),
        String::new(),
        "---".into(),
        String::new(),
        "## Earnings This Week".into(),
        String::new(),
    ]);

    if week_earnings.is_empty() {
        lines.push("*No earnings scheduled this week*".into());
    } else {
        lines.push("| Date | Ticker | Period | Stance |".into());
        lines.push("|------|--------|--------|--------|".into());
        for e in &week_earnings {
            lines.push(format!(
                "| {} | **{}** | {} | {} |",
                e.report_date, e.ticker, e.fiscal_period, e.stance
            ));
        }
    }

    lines.extend(["".into(), "---".into(), "".into(), "## Watchlist Detail".into(), "".into()]);

    // Most confident decisions first
    let mut ordered: Vec<&WatchlistEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        let conf = |e: &WatchlistEntry| {
            recommendations
                .iter()
                .find(|r| r.ticker == e.ticker)
                .map(|r| r.confidence)
                .unwrap_or(0.0)
        };
        conf(b).partial_cmp(&conf(a)).unwrap_or(std::cmp::Ordering::Equal)
    });

    for entry in ordered {
        let rec = recommendations.iter().find(|r| r.ticker == entry.ticker);
        lines.push(format!("### {}", entry.ticker));
        lines.push(String::new());
        lines.push(format!("**Current Stance**: {}", entry.stance));
        match rec {
            Some(rec) => {
                lines.push(format!(
                    "**Recommendation**: {} ({:.0}% confidence)",
                    rec.suggested_stance.to_string().to_uppercase(),
                    rec.confidence * 100.0
                ));
                lines.push(String::new());
                lines.push(format!("**Rationale**: {}", rec.rationale));
            }
            None => lines.push("**Recommendation**: N/A".into()),
        }
        if let Some(notes) = &entry.notes {
            lines.push(String::new());
            lines.push(format!("**Notes**: {notes}"));
        }
        lines.push(String::new());
        lines.push("---".into());
        lines.push(String::new());
    }

    lines.extend([
        "## Notes".into(),
        String::new(),
        "*Add your observations here*".into(),
        String::new(),
        "---".into(),
        String::new(),
        format!(
            "[[{}-weekly|Previous Week]]",
            (today - Duration::days(7)).format("%Y-%m-%d")
        ),
    ]);

    lines.join("\n")
}
