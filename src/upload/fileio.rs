use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{json_error_message, UploadBackend};
use crate::models::{ImageFile, UploadOutcome};

/// Ephemeral file host; success is `success: true` plus a `link`.
pub struct FileIoBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl FileIoBackend {
    pub fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    async fn upload(&self, file: &ImageFile) -> anyhow::Result<String> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("file.io returned a non-JSON body (HTTP {status})"))?;

        let succeeded = body.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
        match (succeeded, body.get("link").and_then(|v| v.as_str())) {
            (true, Some(link)) => Ok(link.to_string()),
            _ => Err(anyhow!(json_error_message(&body).unwrap_or_else(|| format!("file.io upload failed (HTTP {status})")))),
        }
    }
}

#[async_trait]
impl UploadBackend for FileIoBackend {
    fn name(&self) -> &'static str {
        "fileio"
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
    use axum::extract::Multipart;
    use axum::routing::post;
    use axum::{Json, Router};

    #[tokio::test]
    async fn sends_file_part() {
        let app = Router::new().route(
            "/",
            post(|mut multipart: Multipart| async move {
                let field = multipart.next_field().await.unwrap().unwrap();
                assert_eq!(field.name(), Some("file"));
                assert_eq!(field.file_name(), Some("shirt.jpg"));
                assert_eq!(field.bytes().await.unwrap().as_ref(), b"jpeg");
                Json(serde_json::json!({ "success": true, "link": "https://file.io/abc" }))
            }),
        );
        let base = serve(app).await;
        let backend = FileIoBackend::new(reqwest::Client::new(), format!("{base}/"));

        let outcome = backend.attempt_upload(&ImageFile::new("shirt.jpg", "image/jpeg", b"jpeg".to_vec())).await;

        assert_eq!(outcome, UploadOutcome::success("https://file.io/abc"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failure() {
        let backend = FileIoBackend::new(reqwest::Client::new(), "http://127.0.0.1:1/".into());
        let outcome = backend.attempt_upload(&ImageFile::new("a.png", "image/png", vec![1u8])).await;
        assert!(!outcome.succeeded);
        assert!(outcome.error.is_some());
    }
}
