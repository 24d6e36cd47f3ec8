//! Error taxonomy for the binding pipeline and handler results.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::Value;

/// A binding failure, classified by which side is at fault.
///
/// Malformed input is the caller's problem (400-class); a DTO that cannot be
/// bound or a context value of the wrong shape is a server-side fault
/// (500-class).
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    #[error("malformed request body: {0}")]
    Body(String),
    #[error("request does not match the expected shape: {0}")]
    Mismatch(String),
    #[error("context value under key {key:?} is not an object")]
    ContextShape { key: String },
    #[error("request type does not bind to a JSON object")]
    NonStructDto,
}

impl BindError {
    pub fn status(&self) -> StatusCode {
        match self {
            BindError::Body(_) | BindError::Mismatch(_) => StatusCode::BAD_REQUEST,
            BindError::ContextShape { .. } | BindError::NonStructDto => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// A runtime error a handler can return, carrying its own status code.
///
/// Use [`HttpError::new`] for an explicit status; the convenience
/// constructors cover the common cases and everything unclassified defaults
/// to 500 via [`HttpError::internal`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "handler returned an unclassified error");
        Self::internal("internal error")
    }
}

/// A fully formatted failure: the status to send plus the JSON body produced
/// by the active error formatter (or the DTO's own).
#[derive(Debug, Clone)]
pub struct Rejection {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
