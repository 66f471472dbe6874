use axum::{middleware::from_fn, Router};

use crate::middleware::request_id::request_id;
use crate::state::AppState;

pub mod channels;
pub mod health;
pub mod subscriptions;
pub mod webhooks;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhooks::router(state.clone()))
        .merge(subscriptions::router(state.clone()))
        .merge(channels::router(state))
        .layer(from_fn(request_id))
}
