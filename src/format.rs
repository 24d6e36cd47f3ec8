//! Pluggable response and error formatting.
//!
//! Two independent formatting functions shape every wire body: the error
//! formatter turns a bind/validation/handler error into a JSON body, the
//! response formatter wraps a resolved [`Envelope`] into one. Both live in a
//! process-wide slot that must be configured during startup, before the
//! server accepts traffic; swapping them under live requests is last-writer
//! wins and deliberately unsynchronized beyond the atomic pointer swap.
//!
//! Adapters can also carry an explicit [`Formatters`] set (see
//! [`Adapter::formatters`](crate::Adapter::formatters)), which keeps tests
//! independent of the global slot.

use std::error::Error as StdError;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use http::StatusCode;
use serde_json::{json, Value};

use crate::envelope::Envelope;

/// Formats a failed request into the wire body.
pub type ErrorFormatter = Arc<dyn Fn(&(dyn StdError + 'static)) -> Value + Send + Sync>;

/// Formats a resolved envelope into the wire body.
pub type ResponseFormatter = Arc<dyn Fn(&Envelope) -> Value + Send + Sync>;

/// One error formatter plus one response formatter.
#[derive(Clone)]
pub struct Formatters {
    pub(crate) error: ErrorFormatter,
    pub(crate) response: ResponseFormatter,
}

impl Default for Formatters {
    /// The standard envelope: `{"data", "message"}` for both success and
    /// failure, with the failure message fixed to `"Error"`.
    fn default() -> Self {
        Self {
            error: Arc::new(envelope_error),
            response: Arc::new(envelope_response),
        }
    }
}

impl Formatters {
    /// Snapshot of the process-wide formatter set.
    pub fn current() -> Self {
        (*GLOBAL.load_full()).clone()
    }

    pub fn error_formatter(
        mut self,
        f: impl Fn(&(dyn StdError + 'static)) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.error = Arc::new(f);
        self
    }

    pub fn response_formatter(
        mut self,
        f: impl Fn(&Envelope) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.response = Arc::new(f);
        self
    }

    /// Preset: error bodies are the bare message string, unwrapped.
    pub fn raw_error(mut self) -> Self {
        self.error = Arc::new(raw_error);
        self
    }

    /// Preset: success bodies are the raw payload, unwrapped.
    pub fn raw_response(mut self) -> Self {
        self.response = Arc::new(raw_response);
        self
    }
}

static GLOBAL: LazyLock<ArcSwap<Formatters>> =
    LazyLock::new(|| ArcSwap::from_pointee(Formatters::default()));

fn update_global(apply: impl FnOnce(&mut Formatters)) {
    let mut next = (*GLOBAL.load_full()).clone();
    apply(&mut next);
    GLOBAL.store(Arc::new(next));
}

/// Replace the process-wide error formatter. Call during startup only.
pub fn set_error_formatter(
    f: impl Fn(&(dyn StdError + 'static)) -> Value + Send + Sync + 'static,
) {
    update_global(|fmts| fmts.error = Arc::new(f));
}

/// Replace the process-wide response formatter. Call during startup only.
pub fn set_response_formatter(f: impl Fn(&Envelope) -> Value + Send + Sync + 'static) {
    update_global(|fmts| fmts.response = Arc::new(f));
}

/// Process-wide preset: emit error bodies as the bare message string.
pub fn use_raw_error_format() {
    update_global(|fmts| fmts.error = Arc::new(raw_error));
}

/// Process-wide preset: emit success bodies as the raw payload.
pub fn use_raw_response_format() {
    update_global(|fmts| fmts.response = Arc::new(raw_response));
}

fn envelope_error(err: &(dyn StdError + 'static)) -> Value {
    json!({ "data": err.to_string(), "message": "Error" })
}

fn envelope_response(envelope: &Envelope) -> Value {
    let status = envelope.status_code().unwrap_or(StatusCode::OK);
    json!({ "data": envelope.data(), "message": status_message(status) })
}

fn raw_error(err: &(dyn StdError + 'static)) -> Value {
    Value::String(err.to_string())
}

fn raw_response(envelope: &Envelope) -> Value {
    envelope.data().clone()
}

fn status_message(status: StatusCode) -> &'static str {
    if !status.is_success() {
        return "Error";
    }
    match status.as_u16() {
        201 => "Created resource",
        204 => "No content",
        _ => "Ok",
    }
}
