//! Submission state machine behind the browser page.
//!
//! `Idle -> Validating -> Uploading(model, garment) -> Transforming -> Displaying`.
//! Every submission takes a new generation; `reset` takes one too. Transitions
//! and outcomes carrying an older generation are dropped, so a response that
//! lands after a reset never reaches the page.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::ImageFormat;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ImageRole, TryOnError};
use crate::models::{Category, ImageFile, TransformImages, TransformRequest};
use crate::transform::TransformClient;
use crate::upload::UploadResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Display {
    Result(TransformImages),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle { validation_error: Option<String> },
    Validating,
    Uploading { image: UploadStep },
    Transforming,
    Displaying { display: Display },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    Model,
    Garment,
}

impl SessionPhase {
    fn idle() -> Self {
        SessionPhase::Idle { validation_error: None }
    }
}

/// What the form holds at submit time.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub credential: String,
    pub model_image: Option<ImageFile>,
    pub garment_image: Option<ImageFile>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct ValidSubmission {
    pub credential: String,
    pub model_image: ImageFile,
    pub garment_image: ImageFile,
    pub category: Category,
    pub description: Option<String>,
}

impl Submission {
    /// Checks run in the order the page reports them: credential, model image,
    /// garment image, category.
    pub fn validate(self) -> Result<ValidSubmission, TryOnError> {
        let credential = validate_credential(&self.credential)?;
        let model_image = self
            .model_image
            .filter(|f| !f.is_empty())
            .ok_or_else(|| TryOnError::validation("Please upload a model image"))
            .and_then(|f| sniff_image(f, ImageRole::Model))?;
        let garment_image = self
            .garment_image
            .filter(|f| !f.is_empty())
            .ok_or_else(|| TryOnError::validation("Please upload a garment image"))
            .and_then(|f| sniff_image(f, ImageRole::Garment))?;
        let category = validate_category(self.category.as_deref())?;

        Ok(ValidSubmission {
            credential,
            model_image,
            garment_image,
            category,
            description: self.description,
        })
    }
}

pub fn validate_credential(credential: &str) -> Result<String, TryOnError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(TryOnError::validation("Please enter your API key"));
    }
    Ok(credential.to_string())
}

pub fn validate_category(category: Option<&str>) -> Result<Category, TryOnError> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| TryOnError::validation("Please choose a clothing category"))?
        .parse()
}

/// Accepts only content the `image` crate recognises, and fills in the
/// content type when the browser did not send a usable one.
fn sniff_image(mut file: ImageFile, role: ImageRole) -> Result<ImageFile, TryOnError> {
    let format = image::guess_format(&file.bytes)
        .map_err(|_| TryOnError::validation(format!("The {role} image is not a supported image file")))?;
    if !file.content_type.starts_with("image/") {
        file.content_type = mime_for(format).to_string();
    }
    Ok(file)
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Avif => "image/avif",
        _ => "application/octet-stream",
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Failed validation; the shell is back in `Idle` with the message.
    Rejected(TryOnError),
    /// Reached `Displaying`.
    Displayed(Result<TransformImages, TryOnError>),
    /// A reset or newer submission superseded this one.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket(u64);

struct Session {
    phase: SessionPhase,
    generation: u64,
}

pub struct TryOnShell {
    resolver: Arc<UploadResolver>,
    client: TransformClient,
    session: Mutex<Session>,
}

impl TryOnShell {
    pub fn new(resolver: Arc<UploadResolver>, client: TransformClient) -> Self {
        Self {
            resolver,
            client,
            session: Mutex::new(Session {
                phase: SessionPhase::idle(),
                generation: 0,
            }),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.session().phase.clone()
    }

    /// Back to `Idle` unconditionally. Work already in flight keeps running
    /// but its outcome is discarded.
    pub fn reset(&self) {
        let mut session = self.session();
        session.generation += 1;
        session.phase = SessionPhase::idle();
        debug!("session reset generation={}", session.generation);
    }

    pub async fn submit(&self, submission: Submission) -> SubmitOutcome {
        let ticket = self.begin();

        let valid = match submission.validate() {
            Ok(valid) => valid,
            Err(err) => return self.reject(ticket, err),
        };

        if !self.advance(ticket, SessionPhase::Uploading { image: UploadStep::Model }) {
            return SubmitOutcome::Discarded;
        }
        let model_url = match self.upload(&valid.model_image, ImageRole::Model).await {
            Ok(url) => url,
            Err(err) => return self.finish(ticket, Err(err)),
        };

        if !self.advance(ticket, SessionPhase::Uploading { image: UploadStep::Garment }) {
            return SubmitOutcome::Discarded;
        }
        let garment_url = match self.upload(&valid.garment_image, ImageRole::Garment).await {
            Ok(url) => url,
            Err(err) => return self.finish(ticket, Err(err)),
        };

        let request = match TransformRequest::new(model_url, garment_url, valid.category, valid.description) {
            Ok(request) => request,
            Err(err) => return self.finish(ticket, Err(err)),
        };
        self.transform(ticket, request, &valid.credential).await
    }

    /// Transforms two images that are already hosted, skipping uploads.
    pub async fn submit_hosted(
        &self,
        credential: &str,
        model_url: &str,
        garment_url: &str,
        category: Option<&str>,
        description: Option<String>,
    ) -> SubmitOutcome {
        let ticket = self.begin();

        let prepared = validate_credential(credential).and_then(|credential| {
            let category = validate_category(category)?;
            let request = TransformRequest::new(model_url, garment_url, category, description)?;
            Ok((credential, request))
        });
        match prepared {
            Ok((credential, request)) => self.transform(ticket, request, &credential).await,
            Err(err) => self.reject(ticket, err),
        }
    }

    async fn upload(&self, file: &ImageFile, role: ImageRole) -> Result<String, TryOnError> {
        info!("Uploading {} image...", role);
        let outcome = self.resolver.resolve(file).await;
        match (outcome.succeeded, outcome.url) {
            (true, Some(url)) => Ok(url),
            _ => Err(TryOnError::Upload {
                image: role,
                message: outcome.error.unwrap_or_else(|| "Unknown upload error".to_string()),
            }),
        }
    }

    async fn transform(&self, ticket: Ticket, request: TransformRequest, credential: &str) -> SubmitOutcome {
        if !self.advance(ticket, SessionPhase::Transforming) {
            return SubmitOutcome::Discarded;
        }
        let result = self.client.try_transform(&request, credential).await;
        self.finish(ticket, result)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Ticket {
        let mut session = self.session();
        session.generation += 1;
        session.phase = SessionPhase::Validating;
        Ticket(session.generation)
    }

    fn advance(&self, ticket: Ticket, phase: SessionPhase) -> bool {
        let mut session = self.session();
        if session.generation != ticket.0 {
            debug!("dropping stale transition to {:?}", phase);
            return false;
        }
        session.phase = phase;
        true
    }

    fn reject(&self, ticket: Ticket, err: TryOnError) -> SubmitOutcome {
        let phase = SessionPhase::Idle {
            validation_error: Some(err.to_string()),
        };
        if !self.advance(ticket, phase) {
            return SubmitOutcome::Discarded;
        }
        SubmitOutcome::Rejected(err)
    }

    fn finish(&self, ticket: Ticket, result: Result<TransformImages, TryOnError>) -> SubmitOutcome {
        let display = match &result {
            Ok(images) => Display::Result(images.clone()),
            Err(err) => {
                warn!("submission failed kind={} error={}", err.kind(), err);
                Display::Error(err.to_string())
            }
        };
        if !self.advance(ticket, SessionPhase::Displaying { display }) {
            return SubmitOutcome::Discarded;
        }
        SubmitOutcome::Displayed(result)
    }
}
