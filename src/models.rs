use std::fmt;
use std::str::FromStr;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TryOnError;

/// Garment placement region understood by the transformation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    UpperBody,
    LowerBody,
    Dresses,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::UpperBody, Category::LowerBody, Category::Dresses];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::UpperBody => "upper_body",
            Category::LowerBody => "lower_body",
            Category::Dresses => "dresses",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TryOnError::validation(format!("Unsupported clothing category: {s:?}")))
    }
}

/// Reference to an image as the transformation API receives it: either a
/// publicly reachable URL or an inline `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Result<Self, TryOnError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TryOnError::validation("Image reference must not be empty"));
        }
        Ok(ImageRef(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Log-friendly prefix; inline data can be megabytes long.
    pub fn preview(&self) -> &str {
        let end = self.0.char_indices().nth(50).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

/// A file captured from the browser form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub model_image: ImageRef,
    pub garment_image: ImageRef,
    pub category: Category,
    pub description: Option<String>,
}

impl TransformRequest {
    pub fn new(
        model_image: impl Into<String>,
        garment_image: impl Into<String>,
        category: Category,
        description: Option<String>,
    ) -> Result<Self, TryOnError> {
        Ok(Self {
            model_image: ImageRef::new(model_image)?,
            garment_image: ImageRef::new(garment_image)?,
            category,
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

/// Successful transformation output. Either URL may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformImages {
    pub result_image_url: Option<String>,
    pub mask_image_url: Option<String>,
    pub cache_hit: Option<bool>,
}

/// Flattened outcome as rendered by the browser: exactly one of the result
/// or the error is present after a completed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub result_image_url: Option<String>,
    pub mask_image_url: Option<String>,
    pub error: Option<String>,
}

impl TransformResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result_image_url: None,
            mask_image_url: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<TransformImages, TryOnError>> for TransformResult {
    fn from(result: Result<TransformImages, TryOnError>) -> Self {
        match result {
            Ok(images) => Self {
                result_image_url: images.result_image_url,
                mask_image_url: images.mask_image_url,
                error: None,
            },
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Outcome of one upload attempt (or of a whole resolver run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub succeeded: bool,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Response envelope of the transformation API. `code == 200` is success.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiData {
    #[serde(default)]
    pub result_img_url: Option<String>,
    #[serde(default)]
    pub mask_img_url: Option<String>,
    #[serde(default)]
    pub cache_hit: Option<bool>,
}
