use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError { code: code.into(), message: message.into() }),
        }
    }
}

pub fn status_for(error: &AgentError) -> StatusCode {
    match error {
        AgentError::UnresolvableReference(_) | AgentError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
        AgentError::MetadataUnavailable(_) => StatusCode::BAD_GATEWAY,
        AgentError::RunInProgress(_) => StatusCode::CONFLICT,
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ApiResponse::<()>::error(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
