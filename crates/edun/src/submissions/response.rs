use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};

use super::service::SubmissionError;
use super::validation::ValidationError;

/// `{ "success": true, ...data }`.
pub fn success_response<T: Serialize>(data: &T) -> Response {
    let mut body = match serde_json::to_value(data) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            let mut fields = Map::new();
            fields.insert("data".to_string(), other);
            fields
        }
        Err(err) => {
            return error_response(
                "Internal server error",
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(err.to_string()),
            )
        }
    };
    body.insert("success".to_string(), Value::Bool(true));
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

/// `{ "success": false, "error": message }`.
pub fn error_response(message: &str, status: StatusCode, detail: Option<String>) -> Response {
    if let Some(detail) = detail {
        tracing::debug!(%status, detail = %detail, "error response");
    }
    let body = json!({ "success": false, "error": message });
    (status, Json(body)).into_response()
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            SubmissionError::Validation(ValidationError::Invalid { issues, .. }) => {
                let body = json!({
                    "success": false,
                    "error": self.to_string(),
                    "errors": issues,
                });
                (status, Json(body)).into_response()
            }
            _ => error_response(&self.to_string(), status, None),
        }
    }
}

/// Origin `*`, the two request headers the forms send, and the three methods
/// the routes answer.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
}

/// `CorsLayer` answers preflight with an empty 200; the site expects 204.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
