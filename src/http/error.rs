use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::engine::EngineError;

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    Unauthorized(&'static str),
    /// Malformed request: bad JSON, path or query.
    BadRequest(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Forbidden => StatusCode::FORBIDDEN,
                EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::Conflict(_)
                | EngineError::Unavailable { .. }
                | EngineError::InvalidRange
                | EngineError::InvalidInput(_)
                | EngineError::InvalidTransition { .. }
                | EngineError::HasActiveReservations(_)
                | EngineError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(EngineError::WalError(detail)) => {
                tracing::error!("persistence failure: {detail}");
                "internal server error".to_string()
            }
            ApiError::Engine(e) => e.to_string(),
            ApiError::Unauthorized(msg) => msg.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
