use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_macros::debug_handler;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use std::sync::Arc;

use crate::dto::{HealthResponse, SendResponse, SubmissionRequest};
use crate::service::{ContactError, ContactService};

pub fn router(service: Arc<ContactService>) -> Router {
    Router::new()
        .route("/send", post(send_submission))
        .route("/health", get(health_check))
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Decodes a JSON or urlencoded form body. Anything unreadable becomes an
/// empty submission and is rejected by validation.
fn decode_submission(headers: &HeaderMap, body: &[u8]) -> SubmissionRequest {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let decoded: Result<SubmissionRequest, String> =
        if content_type.starts_with("application/json") {
            serde_json::from_slice(body).map_err(|e| e.to_string())
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            serde_urlencoded::from_bytes(body).map_err(|e| e.to_string())
        } else {
            Err(format!("unsupported content type '{content_type}'"))
        };

    decoded.unwrap_or_else(|e| {
        tracing::debug!("Could not decode submission body: {e}");
        SubmissionRequest::default()
    })
}

#[debug_handler]
pub async fn send_submission(
    State(service): State<Arc<ContactService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = decode_submission(&headers, &body);

    match service.submit(request).await {
        Ok(message_id) => {
            tracing::info!("Email sent successfully: {message_id}");
            (StatusCode::OK, Json(SendResponse::sent(message_id))).into_response()
        }
        Err(e) => match e {
            ContactError::MissingFields => (
                StatusCode::BAD_REQUEST,
                Json(SendResponse::rejected(e.to_string())),
            )
                .into_response(),
            ContactError::Delivery(_) => {
                tracing::error!("Email sending failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(SendResponse::failed(e.to_string())),
                )
                    .into_response()
            }
        },
    }
}

#[debug_handler]
pub async fn health_check() -> Response {
    (StatusCode::OK, Json(HealthResponse::ok())).into_response()
}
