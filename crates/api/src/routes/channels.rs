use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::delete;
use axum::{Extension, Router};

use crate::error::{ApiResult, AppError};
use crate::state::{AppState, RequestId};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/channels/{id}", delete(delete_channel))
        .with_state(state)
}

async fn delete_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .registration
        .delete_channel(id)
        .await
        .map_err(|err| AppError::from(err).with_request_id(&request_id.0))?;
    Ok(StatusCode::NO_CONTENT)
}
