use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dreamink_auth::AuthError;
use dreamink_stylize::StylizeError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingFields => Self::bad_request("Missing required fields"),
            AuthError::MissingCredentials => Self::bad_request("Missing credentials"),
            AuthError::PasswordTooShort(_) => Self::bad_request(error.to_string()),
            AuthError::UserExists => Self::conflict("Account already exists"),
            AuthError::InvalidCredentials => Self::unauthorized("Invalid email or password"),
            AuthError::Database(_) | AuthError::PasswordHash(_) | AuthError::InvalidTimestamp(_) => {
                error!(error = ?error, "auth error");
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<StylizeError> for ApiError {
    fn from(error: StylizeError) -> Self {
        match error {
            StylizeError::UnknownStyle(_) => Self::bad_request(error.to_string()),
            StylizeError::InvalidImage(_) => {
                warn!(error = %error, "rejected upload");
                Self::bad_request("Invalid image data")
            }
            StylizeError::RuntimeHttp(_)
            | StylizeError::RuntimeStatus { .. }
            | StylizeError::RuntimeResponse(_)
            | StylizeError::Base64(_) => {
                error!(error = ?error, "model runtime error");
                Self::bad_gateway(format!("Stylization failed: {error}"))
            }
            StylizeError::Encode(_) | StylizeError::Task(_) => {
                error!(error = ?error, "stylization error");
                Self::internal_server_error("Internal server error")
            }
        }
    }
}
