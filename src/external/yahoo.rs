use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use crate::external::market_provider::{FetchPeriod, MarketDataProvider, ProviderError};
use crate::models::{EarningsEvent, NewsItem, PriceBar};

/// Yahoo Finance over the public query endpoints. No API key; rate limits
/// surface as `ProviderError::RateLimited`.
pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ProviderError> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "status {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize, Default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    news: Option<Vec<SearchNewsItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNewsItem {
    title: String,
    link: String,
    publisher: Option<String>,
    provider_publish_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    calendar_events: Option<CalendarEvents>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvents {
    earnings: Option<CalendarEarnings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEarnings {
    earnings_date: Option<Vec<RawValue>>,
    earnings_average: Option<RawValue>,
    revenue_average: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn fiscal_period_for(date: chrono::NaiveDate) -> String {
    let quarter = (date.month0() / 3) + 1;
    format!("Q{} {}", quarter, date.year())
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_prices(
        &self,
        ticker: &str,
        period: FetchPeriod,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{ticker}?range={}&interval=1d",
            period.as_str()
        );
        let body: ChartResponse = self.get_json(url).await?;

        let result = body
            .chart
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| ProviderError::BadResponse("missing chart result".into()))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::BadResponse("missing quote block".into()))?;

        let mut bars = Vec::new();
        for (i, ts) in timestamps.iter().enumerate() {
            // skip half-formed rows (holidays, in-flight sessions)
            let (Some(open), Some(high), Some(low), Some(close)) = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) else {
                continue;
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            let dt = DateTime::<Utc>::from_timestamp(*ts, 0)
                .ok_or_else(|| ProviderError::Parse("bad timestamp".into()))?;

            bars.push(PriceBar {
                ticker: ticker.to_uppercase(),
                date: dt.date_naive(),
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    async fn fetch_news(
        &self,
        ticker: &str,
        max_items: usize,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v1/finance/search?q={ticker}&newsCount={max_items}&quotesCount=0"
        );
        let body: SearchResponse = self.get_json(url).await?;

        let items = body
            .news
            .unwrap_or_default()
            .into_iter()
            .take(max_items)
            .filter_map(|article| {
                let published_at = article
                    .provider_publish_time
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                    .unwrap_or_else(Utc::now);
                if article.link.is_empty() {
                    return None;
                }
                Some(NewsItem {
                    ticker: ticker.to_uppercase(),
                    headline: article.title,
                    url: article.link,
                    source: article.publisher.unwrap_or_else(|| "Yahoo Finance".into()),
                    published_at,
                })
            })
            .collect();

        Ok(items)
    }

    async fn fetch_earnings(&self, ticker: &str) -> Result<Vec<EarningsEvent>, ProviderError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{ticker}?modules=calendarEvents"
        );
        let body: QuoteSummaryResponse = self.get_json(url).await?;

        let Some(earnings) = body
            .quote_summary
            .result
            .and_then(|mut r| r.pop())
            .and_then(|r| r.calendar_events)
            .and_then(|c| c.earnings)
        else {
            return Ok(Vec::new());
        };

        let Some(report_ts) = earnings
            .earnings_date
            .as_ref()
            .and_then(|dates| dates.first())
            .and_then(|v| v.raw)
        else {
            return Ok(Vec::new());
        };

        let report_date = DateTime::<Utc>::from_timestamp(report_ts as i64, 0)
            .ok_or_else(|| ProviderError::Parse("bad earnings timestamp".into()))?
            .date_naive();

        Ok(vec![EarningsEvent {
            ticker: ticker.to_uppercase(),
            fiscal_period: fiscal_period_for(report_date),
            report_date,
            estimate_eps: earnings.earnings_average.and_then(|v| v.raw),
            actual_eps: None,
            estimate_rev: earnings.revenue_average.and_then(|v| v.raw),
            actual_rev: None,
        }])
    }
}
