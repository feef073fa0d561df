use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

use super::UploadBackend;
use crate::models::{ImageFile, UploadOutcome};

/// Encodes the file as a `data:` URL.
pub fn data_url(file: &ImageFile) -> String {
    format!(
        "data:{};base64,{}",
        file.content_type,
        general_purpose::STANDARD.encode(&file.bytes)
    )
}

/// No network at all; the API receives the image inline.
pub struct InlineBackend {
    max_bytes: usize,
}

impl InlineBackend {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

#[async_trait]
impl UploadBackend for InlineBackend {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn attempt_upload(&self, file: &ImageFile) -> UploadOutcome {
        if file.len() > self.max_bytes {
            return UploadOutcome::failure(format!(
                "File too large for inline encoding ({} bytes, limit {})",
                file.len(),
                self.max_bytes
            ));
        }
        UploadOutcome::success(data_url(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_small_files() {
        let file = ImageFile::new("a.png", "image/png", b"hi".to_vec());
        let outcome = InlineBackend::new(10).attempt_upload(&file).await;
        assert_eq!(outcome.url.as_deref(), Some("data:image/png;base64,aGk="));
    }

    #[tokio::test]
    async fn rejects_above_limit() {
        let file = ImageFile::new("big.jpg", "image/jpeg", vec![0u8; 11]);
        let outcome = InlineBackend::new(10).attempt_upload(&file).await;
        assert!(!outcome.succeeded);
        assert!(outcome.error.unwrap().contains("too large"));
    }
}
