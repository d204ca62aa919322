use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use crate::error::Error;

pub mod rest;
pub mod websocket;

pub use rest::create_router;

/// Maps core errors onto HTTP responses with a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_)
            | Error::OutOfRetention { .. }
            | Error::InvalidQuery(_)
            | Error::InvalidAlert(_) => StatusCode::BAD_REQUEST,
            Error::HotelNotFound(_)
            | Error::CityNotFound(_)
            | Error::NoPriceData(_)
            | Error::AlertNotFound(_)
            | Error::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
            Error::SubscriptionExpired(_) => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
