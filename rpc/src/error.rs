//! RPC error types and their HTTP mapping.

use agora_engine::EngineError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Engine(e) => match e {
                EngineError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
                EngineError::Unauthorized => StatusCode::UNAUTHORIZED,
                EngineError::Ineligible => StatusCode::FORBIDDEN,
                EngineError::VotingClosed => StatusCode::CONFLICT,
                EngineError::RelayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Rejected(_) => StatusCode::BAD_GATEWAY,
                EngineError::UnknownPosition(_)
                | EngineError::UnknownCandidate { .. }
                | EngineError::SignerMismatch
                | EngineError::InvalidEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        if let RpcError::Engine(EngineError::TooManyAttempts { retry_after_secs }) = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
