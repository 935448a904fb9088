use axum::extract::State;
use axum::{routing::post, Json, Router};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;
use crate::tools::{dispatch, ToolCall, ToolOutput};

pub fn router() -> Router<AppState> {
    Router::new().route("/tools", post(run_tool))
}

/// Single entry point for the whole operation catalog. The request body
/// names the operation and carries its params; unknown operations fail
/// JSON deserialization before reaching the store.
async fn run_tool(
    State(state): State<AppState>,
    Json(call): Json<ToolCall>,
) -> Result<Json<ToolOutput>, AppError> {
    debug!("tool call: {:?}", call);
    let output = dispatch(&state, call).await?;
    Ok(Json(output))
}
