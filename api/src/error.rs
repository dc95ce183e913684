//! HTTP error mapping
//!
//! Tenancy failures turn into the standard response envelope with a generic
//! message. Diagnostic detail stays in the server log.

use crate::models::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use franchise_tenant::error::StoreError;
use franchise_tenant::TenancyError;
use thiserror::Error;

/// Handler error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resolution, authentication or authorization failure
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    /// Request body failed validation
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Tenancy(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Tenancy(e) => StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Tenancy(e) => {
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                ApiResponse::<()>::error(e.reason_code(), e.public_message())
            }
            Self::BadRequest(detail) => ApiResponse::<()>::error("invalid_request", detail),
        };
        (status, Json(body)).into_response()
    }
}
