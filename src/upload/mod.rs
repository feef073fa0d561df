//! Turns a local image into something the transformation API can fetch.
//!
//! Backends are tried in configured order, once each, until one reports
//! success. A failing backend is a substitution point, not a retry.

mod cloudinary;
mod fileio;
mod imgur;
mod inline;

pub use cloudinary::CloudinaryBackend;
pub use fileio::FileIoBackend;
pub use imgur::ImgurBackend;
pub use inline::{data_url, InlineBackend};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, UploadConfig};
use crate::models::{ImageFile, UploadOutcome};

#[async_trait]
pub trait UploadBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Exactly one attempt. Errors are reported in the outcome, never raised.
    async fn attempt_upload(&self, file: &ImageFile) -> UploadOutcome;
}

pub struct UploadResolver {
    backends: Vec<Box<dyn UploadBackend>>,
}

impl UploadResolver {
    pub fn new(backends: Vec<Box<dyn UploadBackend>>) -> Self {
        Self { backends }
    }

    pub fn from_config(config: &UploadConfig, http: reqwest::Client) -> Self {
        let mut backends: Vec<Box<dyn UploadBackend>> = Vec::with_capacity(config.backends.len());
        for kind in &config.backends {
            match kind {
                BackendKind::Inline => backends.push(Box::new(InlineBackend::new(config.inline_max_bytes))),
                BackendKind::Cloudinary => backends.push(Box::new(CloudinaryBackend::for_cloud(
                    http.clone(),
                    &config.cloudinary_cloud_name,
                    config.cloudinary_upload_preset.clone(),
                    config.cloudinary_api_key.clone(),
                ))),
                BackendKind::Imgur => match &config.imgur_client_id {
                    Some(client_id) => backends.push(Box::new(ImgurBackend::new(http.clone(), client_id.clone()))),
                    None => warn!("imgur backend configured without IMGUR_CLIENT_ID, skipping"),
                },
                BackendKind::FileIo => {
                    backends.push(Box::new(FileIoBackend::new(http.clone(), config.fileio_endpoint.clone())))
                }
            }
        }
        Self::new(backends)
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub async fn resolve(&self, file: &ImageFile) -> UploadOutcome {
        info!("📤 Uploading image: {} ({} bytes)", file.name, file.len());

        let mut errors = Vec::new();
        for backend in &self.backends {
            debug!("trying upload backend {}", backend.name());
            let outcome = backend.attempt_upload(file).await;
            if outcome.succeeded && outcome.url.is_some() {
                info!("✅ {} upload successful", backend.name());
                return outcome;
            }
            let error = outcome.error.unwrap_or_else(|| "no URL returned".to_string());
            warn!("❌ {} upload failed: {}", backend.name(), error);
            errors.push(format!("{}: {}", backend.name(), error));
        }

        if errors.is_empty() {
            return UploadOutcome::failure("No upload backends configured");
        }
        UploadOutcome::failure(format!("All upload backends failed ({})", errors.join("; ")))
    }
}

/// Pulls the most useful message out of a JSON error body.
pub(crate) fn json_error_message(body: &serde_json::Value) -> Option<String> {
    body.pointer("/error/message")
        .or_else(|| body.pointer("/data/error"))
        .or_else(|| body.get("message"))
        .or_else(|| body.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        name: &'static str,
        outcome: UploadOutcome,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UploadBackend for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt_upload(&self, _file: &ImageFile) -> UploadOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn scripted(name: &'static str, outcome: UploadOutcome) -> (Box<dyn UploadBackend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(Scripted { name, outcome, calls: calls.clone() }), calls)
    }

    fn file() -> ImageFile {
        ImageFile::new("a.png", "image/png", vec![1u8, 2, 3])
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let (first, first_calls) = scripted("first", UploadOutcome::failure("down"));
        let (second, second_calls) = scripted("second", UploadOutcome::success("U"));
        let (third, third_calls) = scripted("third", UploadOutcome::success("never"));
        let resolver = UploadResolver::new(vec![first, second, third]);

        let outcome = resolver.resolve(&file()).await;

        assert_eq!(outcome, UploadOutcome::success("U"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausting_the_chain_reports_every_backend() {
        let (a, a_calls) = scripted("a", UploadOutcome::failure("boom"));
        let (b, b_calls) = scripted("b", UploadOutcome::failure("too big"));
        let resolver = UploadResolver::new(vec![a, b]);

        let outcome = resolver.resolve(&file()).await;

        assert!(!outcome.succeeded);
        let error = outcome.error.unwrap();
        assert!(error.contains("a: boom"), "{error}");
        assert!(error.contains("b: too big"), "{error}");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_chain_fails() {
        let outcome = UploadResolver::new(Vec::new()).resolve(&file()).await;
        assert!(!outcome.succeeded);
    }

    #[test]
    fn from_config_skips_imgur_without_client_id() {
        let config = crate::config::Config::from_lookup(|name| match name {
            "UPLOAD_BACKENDS" => Some("imgur,inline".to_string()),
            _ => None,
        })
        .unwrap();
        let resolver = UploadResolver::from_config(&config.upload, reqwest::Client::new());
        assert_eq!(resolver.backend_names(), vec!["inline"]);
    }

    #[test]
    fn error_message_lookup() {
        let body = serde_json::json!({ "error": { "message": "Upload preset not found" } });
        assert_eq!(json_error_message(&body).as_deref(), Some("Upload preset not found"));
        let body = serde_json::json!({ "success": false, "message": "quota" });
        assert_eq!(json_error_message(&body).as_deref(), Some("quota"));
    }
}
