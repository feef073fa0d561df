//! Client for the external try-on transformation API.

use reqwest::multipart::Form;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::TryOnError;
use crate::models::{ApiEnvelope, TransformImages, TransformRequest, TransformResult};

/// Envelope `code` value the API uses for success.
pub const SUCCESS_CODE: i64 = 200;

/// Business code the API returns for "Try on exception"; usually an image URL
/// the service could not fetch.
const TRY_ON_EXCEPTION_CODE: i64 = 20001;

#[derive(Clone)]
pub struct TransformClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TransformClient {
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self::with_endpoint(http, config.endpoint())
    }

    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Same as [`try_transform`](Self::try_transform), flattened for display.
    pub async fn transform(&self, request: &TransformRequest, credential: &str) -> TransformResult {
        self.try_transform(request, credential).await.into()
    }

    pub async fn try_transform(&self, request: &TransformRequest, credential: &str) -> Result<TransformImages, TryOnError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(TryOnError::validation("Please enter your API key"));
        }

        let mut form = Form::new()
            .text("modelImg", request.model_image.as_str().to_string())
            .text("garmentImg", request.garment_image.as_str().to_string())
            .text("category", request.category.as_str());
        if let Some(description) = &request.description {
            form = form.text("garmentDesc", description.clone());
        }

        info!(
            "📤 Sending transform request category={} model={} garment={}",
            request.category,
            request.model_image.preview(),
            request.garment_image.preview()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(credential)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                error!("transform request failed to reach {}: {}", self.endpoint, err);
                TryOnError::from(err)
            })?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("transform response status={} body={}", status, truncate(&response_text, 500));

        interpret_response(status.as_u16(), &response_text)
    }
}

/// Maps an HTTP status and body onto the result or the matching error.
pub fn interpret_response(status: u16, body: &str) -> Result<TransformImages, TryOnError> {
    let parsed = serde_json::from_str::<ApiEnvelope>(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|envelope| envelope.msg)
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| truncate(body, 100).to_string());
        return Err(TryOnError::TransformHttp { status, message });
    }

    let envelope = parsed.map_err(|_| {
        TryOnError::TransformProtocol(format!("Invalid JSON response: {}", truncate(body, 100)))
    })?;

    if envelope.code != SUCCESS_CODE {
        if envelope.code == TRY_ON_EXCEPTION_CODE {
            warn!("API reported a try-on exception; the image URLs are likely unreachable or in an unsupported format");
        }
        return Err(TryOnError::TransformApi {
            code: envelope.code,
            message: envelope.msg.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| TryOnError::TransformProtocol("Missing data field in API response".to_string()))?;

    info!("✅ Transform succeeded cache_hit={:?}", data.cache_hit);
    Ok(TransformImages {
        result_image_url: data.result_img_url,
        mask_image_url: data.mask_img_url,
        cache_hit: data.cache_hit,
    })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::test_support::serve;
    use axum::extract::Multipart;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    fn request() -> TransformRequest {
        TransformRequest::new("https://m.jpg", "https://g.jpg", Category::Dresses, Some("red".into())).unwrap()
    }

    #[test]
    fn success_extracts_both_urls() {
        let result = interpret_response(200, r#"{"code":200,"data":{"resultImgUrl":"A","maskImgUrl":"B"}}"#);
        let result = TransformResult::from(result);
        assert_eq!(
            result,
            TransformResult {
                result_image_url: Some("A".into()),
                mask_image_url: Some("B".into()),
                error: None
            }
        );
    }

    #[test]
    fn api_failure_embeds_code_and_message() {
        let result = TransformResult::from(interpret_response(200, r#"{"code":500,"msg":"x"}"#));
        assert_eq!(result.result_image_url, None);
        assert_eq!(result.mask_image_url, None);
        assert_eq!(result.error.as_deref(), Some("API Error 500: x"));
    }

    #[test]
    fn http_failure_embeds_status_and_message() {
        let err = interpret_response(503, r#"{"code":503,"msg":"overloaded"}"#).unwrap_err();
        assert!(matches!(err, TryOnError::TransformHttp { status: 503, .. }));
        assert_eq!(err.to_string(), "HTTP Error 503: overloaded");

        let err = interpret_response(503, "<html>Service Unavailable</html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP Error 503: <html>Service Unavailable</html>");
    }

    #[test]
    fn missing_data_is_protocol_error() {
        let err = interpret_response(200, r#"{"code":200}"#).unwrap_err();
        assert!(matches!(err, TryOnError::TransformProtocol(_)));
        assert_eq!(err.to_string(), "Missing data field in API response");
    }

    #[test]
    fn garbage_body_is_protocol_error() {
        let err = interpret_response(200, "not json").unwrap_err();
        assert!(matches!(err, TryOnError::TransformProtocol(_)));
    }

    #[test]
    fn partial_payload_is_still_success() {
        let images = interpret_response(200, r#"{"code":200,"data":{"resultImgUrl":"A","cacheHit":true}}"#).unwrap();
        assert_eq!(images.result_image_url.as_deref(), Some("A"));
        assert_eq!(images.mask_image_url, None);
        assert_eq!(images.cache_hit, Some(true));
    }

    #[tokio::test]
    async fn sends_multipart_fields_and_bearer() {
        let app = Router::new().route(
            "/api/openapi/change-clothes-ai",
            post(|headers: HeaderMap, mut multipart: Multipart| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer secret");
                let mut fields = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap().to_string();
                    fields.push((name, field.text().await.unwrap()));
                }
                assert_eq!(
                    fields,
                    vec![
                        ("modelImg".to_string(), "https://m.jpg".to_string()),
                        ("garmentImg".to_string(), "https://g.jpg".to_string()),
                        ("category".to_string(), "dresses".to_string()),
                        ("garmentDesc".to_string(), "red".to_string()),
                    ]
                );
                Json(serde_json::json!({ "code": 200, "data": { "resultImgUrl": "R", "maskImgUrl": "M" } }))
            }),
        );
        let base = serve(app).await;
        let client = TransformClient::with_endpoint(reqwest::Client::new(), format!("{base}/api/openapi/change-clothes-ai"));

        let result = client.transform(&request(), "secret").await;

        assert_eq!(result.result_image_url.as_deref(), Some("R"));
        assert_eq!(result.mask_image_url.as_deref(), Some("M"));
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn http_error_from_server() {
        let app = Router::new().route(
            "/t",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "code": 503, "msg": "busy" }))) }),
        );
        let base = serve(app).await;
        let client = TransformClient::with_endpoint(reqwest::Client::new(), format!("{base}/t"));

        let err = client.try_transform(&request(), "k").await.unwrap_err();

        assert!(matches!(err, TryOnError::TransformHttp { status: 503, ref message } if message == "busy"));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let client = TransformClient::with_endpoint(reqwest::Client::new(), "http://127.0.0.1:1/t");
        let err = client.try_transform(&request(), "k").await.unwrap_err();
        assert!(matches!(err, TryOnError::Network { .. }));
        assert_eq!(err.kind(), "network");
    }

    #[tokio::test]
    async fn blank_credential_never_hits_the_network() {
        // Port 1 would produce a network error if contacted.
        let client = TransformClient::with_endpoint(reqwest::Client::new(), "http://127.0.0.1:1/t");
        for credential in ["", "   ", "\t\n"] {
            let err = client.try_transform(&request(), credential).await.unwrap_err();
            assert!(matches!(err, TryOnError::Validation(_)));
        }
    }
}
