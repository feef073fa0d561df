//! Reachability check for the transformation API.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::multipart::Form;
use serde::Serialize;
use tracing::info;

use crate::transform::SUCCESS_CODE;

/// Sample images published by the API provider for smoke tests.
pub const DEMO_MODEL_URL: &str =
    "https://persistent.changeclothesai.online/change-clothes-ai/assets/examples/person-tab/women/003.jpg";
pub const DEMO_GARMENT_URL: &str =
    "https://persistent.changeclothesai.online/change-clothes-ai/assets/examples/garment-tab/dresses/04-01.jpg";
pub const DEMO_CATEGORY: &str = "dresses";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub is_working: bool,
    pub status: String,
    pub checked_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiStatus {
    fn up(status: impl Into<String>) -> Self {
        Self {
            is_working: true,
            status: status.into(),
            checked_at_ms: now_ms(),
            error: None,
        }
    }

    fn down(status: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            is_working: false,
            status: status.into(),
            checked_at_ms: now_ms(),
            error: Some(error.into()),
        }
    }
}

#[derive(Clone)]
pub struct StatusChecker {
    http: reqwest::Client,
    health_url: String,
    transform_url: String,
}

impl StatusChecker {
    pub fn new(http: reqwest::Client, upstream_base_url: &str, transform_url: impl Into<String>) -> Self {
        Self {
            http,
            health_url: format!("{}/api/health", upstream_base_url.trim_end_matches('/')),
            transform_url: transform_url.into(),
        }
    }

    pub async fn check_health(&self) -> ApiStatus {
        info!("Checking transformation API status...");
        let response = self
            .http
            .get(&self.health_url)
            .header("Accept", "application/json")
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => ApiStatus::up("Service is responding"),
            Ok(response) => {
                let status = response.status();
                ApiStatus::down(
                    format!("Service responded with {}", status.as_u16()),
                    format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("")),
                )
            }
            Err(err) => ApiStatus::down("Service is not responding", err.to_string()),
        }
    }

    /// Sends the provider's sample request with `credential`.
    pub async fn probe(&self, credential: &str) -> ApiStatus {
        info!("Testing transformation API with the sample request...");
        let form = Form::new()
            .text("modelImg", DEMO_MODEL_URL)
            .text("garmentImg", DEMO_GARMENT_URL)
            .text("category", DEMO_CATEGORY);

        let response = match self.http.post(&self.transform_url).bearer_auth(credential).multipart(form).send().await {
            Ok(response) => response,
            Err(err) => return ApiStatus::down("API is not responding", err.to_string()),
        };
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => return ApiStatus::down("API returned an unreadable response", err.to_string()),
        };

        let code = body.get("code").and_then(|c| c.as_i64());
        let msg = body.get("msg").and_then(|m| m.as_str());
        match code {
            Some(SUCCESS_CODE) => ApiStatus::up("API is working correctly"),
            Some(500) => ApiStatus::down(
                "API is experiencing internal errors",
                format!("API Error 500: {}", msg.unwrap_or("Internal server error")),
            ),
            Some(code) => ApiStatus::down(
                "API returned an error",
                format!("API Error {}: {}", code, msg.unwrap_or("Unknown error")),
            ),
            None => ApiStatus::down("API returned an error", "Response has no status code"),
        }
    }

    /// Health check first; the sample request only runs when that passes and
    /// a credential is available.
    pub async fn current(&self, credential: Option<&str>) -> ApiStatus {
        let health = self.check_health().await;
        if !health.is_working {
            return health;
        }
        match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(credential) => self.probe(credential).await,
            None => health,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
