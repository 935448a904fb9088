use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, tools};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api", tools::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
