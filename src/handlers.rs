use crate::deepfake::DeepfakeDetector;
use crate::extraction;
use crate::models::{
    DeepfakeResponse, EvaluationResponse, FactCheckResponse, PaperEvaluation, ScorePercent,
};
use crate::verification::FactVerifier;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<FactVerifier>,
    pub detector: Option<Arc<Mutex<DeepfakeDetector>>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/verify", post(verify_claim))
        .route("/detect", post(detect_deepfake))
        .route("/evaluate", post(evaluate_paper))
        .route("/health", get(health_check))
        .fallback(handle_404)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub claim: Option<String>,
}

pub async fn verify_claim(
    State(state): State<AppState>,
    request: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<FactCheckResponse>, ApiError> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Verify request body rejected: {}", rejection);
            return Err(bad_request("Request must be JSON with a 'claim' field."));
        }
    };

    let claim = match request.claim {
        Some(claim) => claim,
        None => {
            warn!("Verify request missing 'claim' field");
            return Err(bad_request("Request must be JSON with a 'claim' field."));
        }
    };

    if claim.is_empty() {
        warn!("Verify request with empty claim");
        return Err(bad_request("No claim provided"));
    }

    let result = state.verifier.verify_claim(&claim).await;

    Ok(Json(FactCheckResponse::new(result)))
}

pub async fn detect_deepfake(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DeepfakeResponse>, ApiError> {
    let upload = read_upload_field(multipart, "image")
        .await?
        .ok_or_else(|| bad_request("No image file part in the request"))?;

    if upload.filename.is_empty() {
        return Err(bad_request("No file selected for upload"));
    }

    if !has_allowed_image_extension(&upload.filename) {
        return Err(bad_request(
            "Invalid file type. Please upload an image (png, jpg, jpeg, gif, webp).",
        ));
    }

    let detector = state
        .detector
        .clone()
        .ok_or_else(|| internal_error("Deepfake model is not available."))?;

    debug!(
        "Running deepfake detection on {} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let filename = upload.filename;
    let result = tokio::task::spawn_blocking(move || {
        let mut detector = recover_lock(&detector);
        detector.detect(&upload.bytes)
    })
    .await
    .map_err(|e| {
        error!("Deepfake detection task panicked: {}", e);
        internal_error("Could not process image.")
    })?;

    match result {
        Ok(scores) => Ok(Json(DeepfakeResponse::new(scores))),
        Err(e) => {
            warn!("Deepfake detection error for {}: {}", filename, e);
            Err(internal_error(&e.to_string()))
        }
    }
}

pub async fn evaluate_paper(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let upload = read_upload_field(multipart, "pdf")
        .await?
        .ok_or_else(|| bad_request("No PDF file part in the request"))?;

    if upload.filename.is_empty() {
        return Err(bad_request("No file selected for upload"));
    }

    if !upload.filename.to_lowercase().ends_with(".pdf") {
        return Err(bad_request("Invalid file type. Please upload a PDF file."));
    }

    let extracted =
        tokio::task::spawn_blocking(move || extraction::extract_text(&upload.bytes))
            .await
            .map_err(|e| {
                error!("PDF extraction task panicked: {}", e);
                internal_error("An unexpected error occurred processing the PDF.")
            })?;

    let text = match extracted {
        Ok(text) => text,
        Err(e) => {
            warn!("Error extracting text from PDF {}: {}", upload.filename, e);
            return Err(internal_error(
                "Could not extract text from PDF. It might be image-based, encrypted, or corrupted.",
            ));
        }
    };

    if text.trim().is_empty() {
        return Ok(Json(EvaluationResponse::new(
            String::new(),
            PaperEvaluation {
                score_percent: ScorePercent::NotAvailable,
                justification: "No text could be extracted from the PDF.".to_string(),
                truncated: false,
            },
        )));
    }

    let preview = extraction::preview(&text);
    let evaluation = state.verifier.evaluate_paper(&text).await;

    Ok(Json(EvaluationResponse::new(preview, evaluation)))
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Pulls the named file field out of the multipart form. Other fields are
/// drained and ignored.
async fn read_upload_field(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart request: {}", e);
        bad_request("Malformed multipart request")
    })? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| {
                warn!("Failed to read upload body: {}", e);
                bad_request("Could not read uploaded file")
            })?
            .to_vec();

        return Ok(Some(UploadedFile { filename, bytes }));
    }

    Ok(None)
}

/// Takes the mutex even when a previous request panicked while holding
/// it. The session carries no cross-request state, so a poisoned guard is
/// still usable and one bad image must not take the endpoint down.
fn recover_lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn has_allowed_image_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn handle_404() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "endpoint not found".to_string(),
        }),
    )
}
