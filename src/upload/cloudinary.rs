use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::multipart::Form;

use super::{data_url, json_error_message, UploadBackend};
use crate::models::{ImageFile, UploadOutcome};

/// Unsigned upload through an upload preset. Success is marked by `secure_url`.
pub struct CloudinaryBackend {
    http: reqwest::Client,
    endpoint: String,
    upload_preset: String,
    api_key: Option<String>,
}

impl CloudinaryBackend {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, upload_preset: String, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            upload_preset,
            api_key,
        }
    }

    pub fn for_cloud(http: reqwest::Client, cloud_name: &str, upload_preset: String, api_key: Option<String>) -> Self {
        let endpoint = format!("https://api.cloudinary.com/v1_1/{cloud_name}/image/upload");
        Self::new(http, endpoint, upload_preset, api_key)
    }

    async fn upload(&self, file: &ImageFile) -> anyhow::Result<String> {
        let mut form = Form::new()
            .text("file", data_url(file))
            .text("upload_preset", self.upload_preset.clone());
        if let Some(key) = &self.api_key {
            form = form.text("api_key", key.clone());
        }

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Cloudinary returned a non-JSON body (HTTP {status})"))?;

        match body.get("secure_url").and_then(|v| v.as_str()) {
            Some(url) => Ok(url.to_string()),
            None => Err(anyhow!(json_error_message(&body).unwrap_or_else(|| "Failed to upload to Cloudinary".to_string()))),
        }
    }
}

#[async_trait]
impl UploadBackend for CloudinaryBackend {
    fn name(&self) -> &'static str {
        "cloudinary"
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
    async fn returns_secure_url_and_sends_preset() {
        let app = Router::new().route(
            "/upload",
            post(|mut multipart: Multipart| async move {
                let mut preset = None;
                let mut file = None;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let text = field.text().await.unwrap();
                    match name.as_str() {
                        "upload_preset" => preset = Some(text),
                        "file" => file = Some(text),
                        _ => {}
                    }
                }
                assert_eq!(preset.as_deref(), Some("ml_default"));
                assert!(file.unwrap().starts_with("data:image/png;base64,"));
                Json(serde_json::json!({ "secure_url": "https://res.cloudinary.com/x.png" }))
            }),
        );
        let base = serve(app).await;
        let backend = CloudinaryBackend::new(reqwest::Client::new(), format!("{base}/upload"), "ml_default".into(), None);

        let outcome = backend.attempt_upload(&ImageFile::new("a.png", "image/png", vec![1u8])).await;

        assert_eq!(outcome, UploadOutcome::success("https://res.cloudinary.com/x.png"));
    }

    #[tokio::test]
    async fn surfaces_error_message() {
        let app = Router::new().route(
            "/upload",
            post(|| async { Json(serde_json::json!({ "error": { "message": "Upload preset must be whitelisted" } })) }),
        );
        let base = serve(app).await;
        let backend = CloudinaryBackend::new(reqwest::Client::new(), format!("{base}/upload"), "p".into(), None);

        let outcome = backend.attempt_upload(&ImageFile::new("a.png", "image/png", vec![1u8])).await;

        assert_eq!(outcome.error.as_deref(), Some("Upload preset must be whitelisted"));
    }
}
