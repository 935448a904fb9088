use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::Stance;

/// One generated recommendation. Persisted rows form an append-only
/// decision history and are never overwritten. `generated_at` always
/// equals the `as_of` of the summary it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recommendation {
    pub ticker: String,
    pub generated_at: DateTime<Utc>,
    pub suggested_stance: Stance,
    pub confidence: f64,
    pub rationale: String,
    pub inputs_snapshot: Json<serde_json::Value>,
}
