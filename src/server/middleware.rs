use super::handlers::{AppState, error_response};
use crate::{
    error::ServiceError,
    validation::{self, ImagePayload},
};
use axum::{
    body::{self, Body},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error};

/// Rejects image analysis requests whose `image_base64` is missing, undecodable or
/// oversized. Accepted requests continue with their original body.
pub async fn validate_image(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Image validation error: failed to read request body: {}", e);
            return error_response(ServiceError::ValidationFailed).into_response();
        }
    };

    // Bodies that are not JSON at all are left for the JSON extractor to reject.
    if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
        let checked = ImagePayload::from_json(&body)
            .inspect_err(|_| error!("Image validation error: image_base64 is not a string"))
            .and_then(|payload| validation::validate_image(payload.image_base64.as_deref()));

        match checked {
            Ok(image) => debug!(
                "Image accepted ({} bytes, subtype: {:?})",
                image.byte_len, image.subtype
            ),
            Err(err) => return error_response(err).into_response(),
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
