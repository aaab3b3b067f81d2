//! Axum handlers for the ask API.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::insight::classifier::TemplateKind;
use crate::insight::resolver::resolve_prompt;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub request_id: Uuid,
    pub template: TemplateKind,
    pub report: String,
}

/// POST /api/v1/ask
///
/// Resolves one free-text question into a report. Resolution itself never
/// fails; only an empty prompt is rejected up front.
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }

    let request_id = Uuid::new_v4();
    info!(%request_id, "ask request received");

    let resolution =
        resolve_prompt(state.executor.as_ref(), state.narrator.as_ref(), &request.prompt).await;

    Ok(Json(AskResponse {
        request_id,
        template: resolution.template,
        report: resolution.report,
    }))
}
