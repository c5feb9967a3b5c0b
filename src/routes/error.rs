use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, error};

use crate::model::{database, user::ValidationError};

/// Everything a handler can fail with, and the status it answers with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store failures on writes whose input was already decoded.
    ///
    /// A dangling reference or a rejected row means the input was bad.
    pub fn rejected_input(err: database::Error) -> ApiError {
        match err {
            database::Error::Reference(message) | database::Error::Storage(message) => {
                ApiError::BadRequest(message)
            }
            err => err.into(),
        }
    }
}

impl From<database::Error> for ApiError {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::NotFound(_) => ApiError::NotFound(err.to_string()),
            database::Error::Conflict(message) | database::Error::Reference(message) => {
                ApiError::Conflict(message)
            }
            database::Error::Storage(message) => ApiError::Internal(message),
            database::Error::Cancelled => ApiError::Timeout,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let body = serde_json::json!({ "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
