use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::shortener::ShortenError;

/// Everything a handler can fail with, and how it looks on the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing bearer token")]
    MissingToken,
    #[error("unauthorized")]
    Unauthorized,
    #[error("Link not found.")]
    NotFound,
    #[error("request timed out")]
    Timeout,
    #[error("There was an error with the database.")]
    Database,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Database | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Signup and login pass the provider's complaint straight to the client.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ShortenError> for ApiError {
    fn from(err: ShortenError) -> Self {
        match err {
            ShortenError::InvalidUrl(reason) => {
                ApiError::BadRequest(format!("originalUrl is not a valid URL: {}", reason))
            }
            ShortenError::CodeSpaceExhausted(_) | ShortenError::Store(_) => ApiError::Database,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Debug, Serialize)]
        struct ErrorBody {
            error: String,
        }

        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
