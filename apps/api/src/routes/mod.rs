pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::insight::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/ask", post(handlers::handle_ask))
        .with_state(state)
}
