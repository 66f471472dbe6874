use axum::{extract::State, routing::post, Extension, Json, Router};
use serde_json::json;

use crate::error::{ApiResult, AppError};
use crate::state::{AppState, RequestId};
use relay_core::types::InboundPost;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/rss", post(process_post_notification))
        .with_state(state)
}

/// Inbound post notification from the forwarder agent. Answers success once
/// the post was accepted and fanned out; individual delivery failures are
/// logged, not surfaced, so the agent never re-sends on a partial failure.
async fn process_post_notification(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(post): Json<InboundPost>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .pipeline
        .process(post)
        .await
        .map_err(|err| AppError::from(err).with_request_id(&request_id.0))?;
    Ok(Json(json!({"status": "success"})))
}
