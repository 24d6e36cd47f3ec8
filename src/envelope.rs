//! The handler-facing response envelope and status resolution.

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;

/// The value a handler returns: a payload plus an optional explicit status.
///
/// Created by the handler, consumed exactly once by the adapter. When the
/// status is left unset the adapter substitutes the per-method default from
/// [`status_for_method`] and writes it back before the response formatter
/// runs, so the formatter sees the resolved value.
#[derive(Debug, Clone)]
pub struct Envelope {
    data: Value,
    status: Option<StatusCode>,
}

impl Envelope {
    /// Wrap a serializable payload.
    ///
    /// A payload that fails to serialize is logged and replaced with a null
    /// body forced to 500, so the fault surfaces instead of crashing the
    /// request.
    pub fn of(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                data: value,
                status: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "envelope payload did not serialize");
                Self {
                    data: Value::Null,
                    status: Some(StatusCode::INTERNAL_SERVER_ERROR),
                }
            }
        }
    }

    /// Wrap an already-built JSON value.
    pub fn json(data: Value) -> Self {
        Self { data, status: None }
    }

    /// Override the method-based default status.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = Some(code);
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Resolve the final status: an explicit override wins, otherwise the
    /// per-method default. The resolved value is written back so repeated
    /// inspection is consistent.
    pub(crate) fn resolve_status(&mut self, method: &Method) -> StatusCode {
        let resolved = self.status.unwrap_or_else(|| status_for_method(method));
        self.status = Some(resolved);
        resolved
    }
}

/// Default success status per HTTP method.
///
/// Methods outside the table resolve to 200; `StatusCode` has no zero value
/// to degrade to, and a handler can always override explicitly.
pub fn status_for_method(method: &Method) -> StatusCode {
    match method.as_str() {
        "POST" => StatusCode::CREATED,
        "HEAD" => StatusCode::NO_CONTENT,
        "GET" | "PUT" | "PATCH" | "DELETE" | "OPTIONS" => StatusCode::OK,
        _ => StatusCode::OK,
    }
}

/// Conversion from a handler's return value into an envelope or a fault.
///
/// Implemented for [`Envelope`] itself, for `Option<Envelope>` where `None`
/// is the "handler produced no response" server fault, and for
/// `Result<Envelope, E>` so handlers can use `?` with [`HttpError`] or
/// `anyhow::Error`.
pub trait IntoEnvelope {
    fn into_envelope(self) -> Result<Envelope, HttpError>;
}

impl IntoEnvelope for Envelope {
    fn into_envelope(self) -> Result<Envelope, HttpError> {
        Ok(self)
    }
}

impl IntoEnvelope for Option<Envelope> {
    fn into_envelope(self) -> Result<Envelope, HttpError> {
        self.ok_or_else(|| HttpError::internal("handler produced no response"))
    }
}

impl<E> IntoEnvelope for Result<Envelope, E>
where
    E: Into<HttpError>,
{
    fn into_envelope(self) -> Result<Envelope, HttpError> {
        self.map_err(Into::into)
    }
}
