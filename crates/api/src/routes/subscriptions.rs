use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiResult, AppError};
use crate::state::{AppState, RequestId};
use relay_db::models::Subscription;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions/{id}", delete(delete_subscription))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionRequest {
    channel_url: String,
    callback_url: String,
}

#[derive(Debug, Serialize)]
struct SubscriptionResponse {
    id: i64,
    channel_id: i64,
    callback_url: String,
    is_active: bool,
    title: Option<String>,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            channel_id: sub.channel_id,
            callback_url: sub.callback_url,
            is_active: sub.is_active,
            title: sub.title,
            photo_url: sub.photo_url,
            created_at: sub.created_at,
        }
    }
}

async fn create_subscription(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = state
        .registration
        .create_subscription(&req.channel_url, &req.callback_url)
        .await
        .map_err(|err| AppError::from(err).with_request_id(&request_id.0))?;
    Ok(Json(subscription.into()))
}

async fn delete_subscription(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .registration
        .delete_subscription(id)
        .await
        .map_err(|err| AppError::from(err).with_request_id(&request_id.0))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::testutil;

    fn create_request(channel_url: &str, callback_url: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/subscriptions")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "channel_url": channel_url,
                    "callback_url": callback_url,
                })
                .to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_subscription_row() {
        let (app, _store) = testutil::app_with_store();

        let response = app
            .oneshot(create_request(
                "https://t.me/test_channel",
                "http://callback.example/hook",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["id"].as_i64().unwrap() > 0);
        assert!(json["channel_id"].as_i64().unwrap() > 0);
        assert_eq!(json["callback_url"], "http://callback.example/hook");
        assert_eq!(json["is_active"], true);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_conflict() {
        let (app, _store) = testutil::app_with_store();

        let first = app
            .clone()
            .oneshot(create_request(
                "https://t.me/test_channel",
                "http://callback.example/hook",
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(create_request(
                "https://t.me/test_channel",
                "http://callback.example/hook",
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(second.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn test_invalid_channel_url_is_400() {
        let (app, _store) = testutil::app_with_store();

        let response = app
            .oneshot(create_request("not a url", "http://callback.example/hook"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_returns_no_content() {
        let (app, _store) = testutil::app_with_store();

        let created = app
            .clone()
            .oneshot(create_request(
                "https://t.me/test_channel",
                "http://callback.example/hook",
            ))
            .await
            .unwrap();
        let body = to_bytes(created.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let id = json["id"].as_i64().unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/subscriptions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_delete_missing_is_404() {
        let (app, _store) = testutil::app_with_store();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/subscriptions/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
