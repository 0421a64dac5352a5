use super::types::{ChatRequest, ErrorResponse, ImageAnalysisRequest, ReplyResponse};
use crate::{error::ServiceError, gateway::InferenceGateway};
use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<InferenceGateway>,
    pub body_limit: usize,
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ReplyResponse>, HandlerError> {
    let Json(request) = payload.map_err(rejection_response)?;
    info!("Received chat request");

    state
        .gateway
        .chat_with_text(request.message.as_deref())
        .await
        .map(|reply| Json(ReplyResponse { reply }))
        .map_err(error_response)
}

pub async fn analyze_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageAnalysisRequest>, JsonRejection>,
) -> Result<Json<ReplyResponse>, HandlerError> {
    let Json(request) = payload.map_err(rejection_response)?;
    info!(
        "Received image analysis request (custom query: {})",
        request.query.is_some()
    );

    state
        .gateway
        .analyze_image(request.image_base64.as_deref(), request.query.as_deref())
        .await
        .map(|reply| Json(ReplyResponse { reply }))
        .map_err(error_response)
}

/// Bodies the JSON extractor refuses (wrong content type, syntax or shape) get the
/// same `{ "error": ... }` envelope as every other failure. Serde detail stays in the log.
fn rejection_response(rejection: JsonRejection) -> HandlerError {
    debug!(
        "JSON body rejected ({}): {}",
        rejection.status(),
        rejection.body_text()
    );
    error_response(ServiceError::InvalidRequestBody)
}

/// Renders a [`ServiceError`] as `{ "error": ... }` with its status code.
pub fn error_response(err: ServiceError) -> HandlerError {
    if err.is_client_error() {
        warn!("Rejected request: {}", err);
    }

    (
        err.status_code(),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
