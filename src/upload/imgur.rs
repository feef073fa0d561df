use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::multipart::Form;

use super::{json_error_message, UploadBackend};
use crate::models::{ImageFile, UploadOutcome};

const IMGUR_ENDPOINT: &str = "https://api.imgur.com/3/image";

/// Anonymous Imgur upload. Needs a registered client id.
pub struct ImgurBackend {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl ImgurBackend {
    pub fn new(http: reqwest::Client, client_id: String) -> Self {
        Self::with_endpoint(http, IMGUR_ENDPOINT, client_id)
    }

    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>, client_id: String) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            client_id,
        }
    }

    async fn upload(&self, file: &ImageFile) -> anyhow::Result<String> {
        let form = Form::new()
            .text("image", general_purpose::STANDARD.encode(&file.bytes))
            .text("type", "base64")
            .text("name", file.name.clone());

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Imgur returned a non-JSON body (HTTP {status})"))?;

        let succeeded = body.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
        let link = body.pointer("/data/link").and_then(|v| v.as_str());
        match (succeeded, link) {
            (true, Some(link)) => Ok(link.to_string()),
            _ => Err(anyhow!(json_error_message(&body).unwrap_or_else(|| format!("Imgur upload failed (HTTP {status})")))),
        }
    }
}

#[async_trait]
impl UploadBackend for ImgurBackend {
    fn name(&self) -> &'static str {
        "imgur"
    }

    async fn attempt_upload(&self, file: &ImageFile) -> UploadOutcome {
        match self.upload(file).await {
            Ok(url) => UploadOutcome::success(url),
            Err(err) => UploadOutcome::failure(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    #[tokio::test]
    async fn uses_client_id_and_returns_link() {
        let app = Router::new().route(
            "/3/image",
            post(|headers: HeaderMap| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Client-ID abc");
                Json(serde_json::json!({ "success": true, "status": 200, "data": { "link": "https://i.imgur.com/x.png" } }))
            }),
        );
        let base = serve(app).await;
        let backend = ImgurBackend::with_endpoint(reqwest::Client::new(), format!("{base}/3/image"), "abc".into());

        let outcome = backend.attempt_upload(&ImageFile::new("a.png", "image/png", vec![1u8])).await;

        assert_eq!(outcome.url.as_deref(), Some("https://i.imgur.com/x.png"));
    }

    #[tokio::test]
    async fn rejected_upload_is_a_failure() {
        let app = Router::new().route(
            "/3/image",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({ "success": false, "status": 403, "data": { "error": "Invalid client_id" } })),
                )
            }),
        );
        let base = serve(app).await;
        let backend = ImgurBackend::with_endpoint(reqwest::Client::new(), format!("{base}/3/image"), "bad".into());

        let outcome = backend.attempt_upload(&ImageFile::new("a.png", "image/png", vec![1u8])).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.error.as_deref(), Some("Invalid client_id"));
    }
}
