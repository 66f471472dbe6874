use axum::http::HeaderValue;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use nanoid::nanoid;

use crate::state::RequestId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Tags every request with an id for log and error-body correlation. An id
/// supplied by the caller is kept, so a forwarder agent re-sending the same
/// notification stays correlated across attempts; otherwise a fresh id is
/// minted.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", nanoid!(16)));

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
