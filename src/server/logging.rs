use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, error, trace, warn};

fn sanitize_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    const REDACT: &[&str] = &["authorization", "cookie", "x-api-key"];
    const MAX_HEADER_VALUE_LEN: usize = 128;
    headers
        .iter()
        .map(|(name, value)| {
            let val = if REDACT.contains(&name.as_str()) {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.chars().take(MAX_HEADER_VALUE_LEN).collect())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (name.as_str().to_string(), val)
        })
        .collect()
}

pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    trace!(target: "http", "request headers method={} path={} headers={:?}", method, path, sanitize_headers(req.headers()));
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    if path == "/health" {
        trace!(target: "http", "health check status={} duration_ms={}", status.as_u16(), duration_ms);
    } else if status.is_server_error() {
        error!(target: "http", "request failed method={} path={} status={} duration_ms={}", method, path, status.as_u16(), duration_ms);
    } else if status.is_client_error() {
        warn!(target: "http", "request rejected method={} path={} status={} duration_ms={}", method, path, status.as_u16(), duration_ms);
    } else {
        debug!(target: "http", "request method={} path={} status={} duration_ms={}", method, path, status.as_u16(), duration_ms);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("content-type", "multipart/form-data".parse().unwrap());

        let sanitized = sanitize_headers(&headers);

        assert!(sanitized.contains(&("authorization".to_string(), "<redacted>".to_string())));
        assert!(sanitized.contains(&("content-type".to_string(), "multipart/form-data".to_string())));
    }
}
