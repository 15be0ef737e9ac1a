//! Unified API error type — every 4xx/5xx response is JSON with a consistent shape.
//!
//! ```json
//! { "code": "unknown_callback", "message": "no pending request for callback id 'x'" }
//! ```

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: msg.into(),
        }
    }

    pub fn unknown_callback(callback_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "unknown_callback",
            message: format!("no pending request for callback id '{callback_id}'"),
        }
    }

    /// The outbound define/update call was refused by the service.
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "upstream_error",
            message: msg.into(),
        }
    }

    /// The service never called back within the resolve window.
    pub fn resolve_timeout(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            code: "resolve_timeout",
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code,
            message: self.message,
        };
        let mut resp = (self.status, Json(body)).into_response();
        resp.headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        resp
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.status.as_u16(),
            self.code,
            self.message
        )
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_serializes_code_and_message() {
        let body = ApiErrorBody {
            code: "unknown_callback",
            message: "no pending request for callback id 'x'".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "unknown_callback");
        assert!(json["message"].as_str().unwrap().contains("'x'"));
    }

    #[test]
    fn unknown_callback_maps_to_404() {
        let err = AppError::unknown_callback("promo1123-0");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "unknown_callback");
    }

    #[test]
    fn resolve_timeout_maps_to_504() {
        let err = AppError::resolve_timeout("no resolve within 10000ms");
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code, "resolve_timeout");
    }
}
