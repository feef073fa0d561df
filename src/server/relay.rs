//! Pass-through for `/api/*` to the fixed upstream origin.
//!
//! The browser cannot call the upstream directly (no CORS headers there), so
//! requests are forwarded verbatim and the response comes back with
//! permissive cross-origin headers. Stateless: no queueing or retries.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error, info};

use super::AppState;

pub const PROXY_ERROR: &str = "Proxy error";

#[derive(Debug, Clone)]
pub struct CorsHeaders {
    pub allow_methods: HeaderValue,
    pub allow_headers: HeaderValue,
}

impl CorsHeaders {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

/// Preflight is answered here; the upstream is never contacted.
pub async fn handle_preflight(State(state): State<Arc<AppState>>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    state.cors.apply(response.headers_mut());
    response
}

pub async fn handle_forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());
    let target = format!("{}{}", state.config.relay.upstream_base_url, path_and_query);
    info!(
        "Proxying {} {} to {} authorization={}",
        method,
        uri.path(),
        target,
        if headers.contains_key(AUTHORIZATION) { "present" } else { "missing" }
    );

    let mut response = match forward(&state, &method, &target, &headers, body).await {
        Ok(response) => response,
        Err(err) => {
            error!("Proxy error target={} error={}", target, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": PROXY_ERROR, "message": err.to_string() })),
            )
                .into_response()
        }
    };
    state.cors.apply(response.headers_mut());
    response
}

async fn forward(
    state: &AppState,
    method: &Method,
    target: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, reqwest::Error> {
    let upstream_method = reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::POST);
    let mut request = state.relay_http.request(upstream_method, target).body(body);

    for name in &state.config.relay.forward_headers {
        if let Some(value) = headers.get(name) {
            request = request.header(name.as_str(), value.as_bytes());
        }
    }
    // Inbound credential wins over anything else; absent means none is sent.
    if let Some(value) = headers.get(AUTHORIZATION) {
        request = request.header(AUTHORIZATION.as_str(), value.as_bytes());
    }

    let upstream = request.send().await?;
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
    let bytes = upstream.bytes().await?;
    debug!("Response status={} body_size={}", status.as_u16(), bytes.len());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
