use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Stance;

/// One fiscal period per ticker; upserted as estimates firm up and
/// actuals arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EarningsEvent {
    pub ticker: String,
    pub fiscal_period: String,
    pub report_date: NaiveDate,
    pub estimate_eps: Option<f64>,
    pub actual_eps: Option<f64>,
    pub estimate_rev: Option<f64>,
    pub actual_rev: Option<f64>,
}

impl EarningsEvent {
    /// EPS surprise as a percentage of the estimate, once both are known.
    pub fn eps_surprise_pct(&self) -> Option<f64> {
        match (self.actual_eps, self.estimate_eps) {
            (Some(actual), Some(estimate)) if estimate != 0.0 => {
                Some((actual - estimate) / estimate.abs() * 100.0)
            }
            _ => None,
        }
    }

    pub fn rev_surprise_pct(&self) -> Option<f64> {
        match (self.actual_rev, self.estimate_rev) {
            (Some(actual), Some(estimate)) if estimate != 0.0 => {
                Some((actual - estimate) / estimate.abs() * 100.0)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsCalendarEntry {
    pub ticker: String,
    pub fiscal_period: String,
    pub report_date: NaiveDate,
    pub days_until: i64,
    pub stance: Stance,
    pub estimate_eps: Option<f64>,
}
