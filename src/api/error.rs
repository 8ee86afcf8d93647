use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::aggregates::OrderError;
use crate::StorefrontError;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorefrontError::Validation(_) | StorefrontError::Coupon(_) => StatusCode::BAD_REQUEST,
            StorefrontError::NotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StorefrontError::Forbidden => StatusCode::FORBIDDEN,
            StorefrontError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StorefrontError::Order(e) => match e {
                OrderError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::TransitionNotPermitted { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self { StorefrontError::Validation(rejection.body_text()) }
}

/// `Json` body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(StorefrontError))]
pub struct ApiJson<T>(pub T);
