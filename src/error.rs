//! Error types for the try-on relay.
//!
//! Every failure of a submission is one of the [`TryOnError`] variants. They are
//! caught at the boundary of the operation that produced them and turned into
//! a user-facing message; none of them stops the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::TransformResult;

/// Which of the two submitted images an upload error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Model,
    Garment,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRole::Model => write!(f, "model"),
            ImageRole::Garment => write!(f, "garment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TryOnError {
    /// Missing credential, file or category before anything touches the network
    #[error("{0}")]
    Validation(String),

    /// Every hosting backend was tried and none produced a URL
    #[error("Failed to upload {image} image: {message}")]
    Upload { image: ImageRole, message: String },

    /// Non-2xx from the transformation API
    #[error("HTTP Error {status}: {message}")]
    TransformHttp { status: u16, message: String },

    /// 2xx, but the envelope code is not the success sentinel
    #[error("API Error {code}: {message}")]
    TransformApi { code: i64, message: String },

    /// Body could not be understood
    #[error("{0}")]
    TransformProtocol(String),

    /// Connection refused, DNS, timeout and friends
    #[error("Network error: {message}")]
    Network { message: String, timed_out: bool },
}

impl TryOnError {
    pub fn validation(message: impl Into<String>) -> Self {
        TryOnError::Validation(message.into())
    }

    /// Short machine-readable name, used in logs and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TryOnError::Validation(_) => "validation",
            TryOnError::Upload { .. } => "upload",
            TryOnError::TransformHttp { .. } => "transform_http",
            TryOnError::TransformApi { .. } => "transform_api",
            TryOnError::TransformProtocol(_) => "transform_protocol",
            TryOnError::Network { .. } => "network",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TryOnError::Validation(_) => StatusCode::BAD_REQUEST,
            TryOnError::Network { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for TryOnError {
    fn from(err: reqwest::Error) -> Self {
        TryOnError::Network {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for TryOnError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::to_value(TransformResult::failed(self.to_string()))
            .unwrap_or_else(|_| serde_json::json!({ "error": self.to_string() }));
        body["kind"] = serde_json::Value::from(self.kind());
        (status, Json(body)).into_response()
    }
}

/// Startup configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown upload backend: {0}")]
    UnknownBackend(String),

    #[error("Upload backend chain is empty")]
    EmptyChain,
}
