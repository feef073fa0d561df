use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, trace};

use super::AppState;
use crate::error::TryOnError;
use crate::models::{ImageFile, TransformResult};
use crate::session::{Submission, SubmitOutcome, TryOnShell};
use crate::status::{DEMO_CATEGORY, DEMO_GARMENT_URL, DEMO_MODEL_URL};

pub async fn handle_health() -> impl IntoResponse {
    trace!("health check: ok");
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Credential from `Authorization: Bearer`, falling back to the configured key.
pub async fn handle_status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let credential = bearer(&headers).or_else(|| state.config.api_key.clone());
    Json(state.status.current(credential.as_deref()).await)
}

pub async fn handle_submit(State(state): State<Arc<AppState>>, headers: HeaderMap, multipart: Multipart) -> Response {
    let mut submission = match read_form(multipart).await {
        Ok(form) => form.into_submission(),
        Err(err) => return err.into_response(),
    };
    if submission.credential.trim().is_empty() {
        submission.credential = bearer(&headers).unwrap_or_default();
    }

    let shell = TryOnShell::new(state.resolver.clone(), state.client.clone());
    respond(shell.submit(submission).await)
}

/// Runs the provider's sample images through the API; no uploads involved.
pub async fn handle_demo(State(state): State<Arc<AppState>>, headers: HeaderMap, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let credential = Some(form.api_key)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| bearer(&headers))
        .unwrap_or_default();

    let shell = TryOnShell::new(state.resolver.clone(), state.client.clone());
    respond(
        shell
            .submit_hosted(&credential, DEMO_MODEL_URL, DEMO_GARMENT_URL, Some(DEMO_CATEGORY), None)
            .await,
    )
}

fn respond(outcome: SubmitOutcome) -> Response {
    match outcome {
        SubmitOutcome::Displayed(Ok(images)) => {
            let cache_hit = images.cache_hit;
            let mut body = serde_json::to_value(TransformResult::from(Ok::<_, TryOnError>(images)))
                .unwrap_or_else(|_| serde_json::json!({}));
            body["cacheHit"] = serde_json::json!(cache_hit);
            Json(body).into_response()
        }
        SubmitOutcome::Displayed(Err(err)) | SubmitOutcome::Rejected(err) => err.into_response(),
        SubmitOutcome::Discarded => (
            StatusCode::CONFLICT,
            Json(TransformResult::failed("Submission was superseded")),
        )
            .into_response(),
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Default)]
struct TryOnForm {
    api_key: String,
    model_img: Option<ImageFile>,
    garment_img: Option<ImageFile>,
    category: Option<String>,
    garment_desc: Option<String>,
}

impl TryOnForm {
    fn into_submission(self) -> Submission {
        Submission {
            credential: self.api_key,
            model_image: self.model_img,
            garment_image: self.garment_img,
            category: self.category,
            description: self.garment_desc,
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<TryOnForm, TryOnError> {
    let malformed = |e: axum::extract::multipart::MultipartError| TryOnError::validation(format!("Malformed form data: {e}"));
    let mut form = TryOnForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "apiKey" => form.api_key = field.text().await.map_err(malformed)?,
            "category" => form.category = Some(field.text().await.map_err(malformed)?),
            "garmentDesc" => form.garment_desc = Some(field.text().await.map_err(malformed)?),
            "modelImg" | "garmentImg" => {
                let file_name = field.file_name().unwrap_or(&name).to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                let file = Some(ImageFile::new(file_name, content_type, bytes)).filter(|f| !f.is_empty());
                if name == "modelImg" {
                    form.model_img = file;
                } else {
                    form.garment_img = file;
                }
            }
            other => debug!("ignoring form field {}", other),
        }
    }
    Ok(form)
}
