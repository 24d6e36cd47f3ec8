//! The contract a request DTO must satisfy to be bound by the adapter.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A request DTO that the binding pipeline can populate and validate.
///
/// `Default + Serialize` seed the merge accumulator with the DTO's
/// zero-valued object form, so fields that no source provides keep their
/// defaults and are left for [`validate`](Bindable::validate) to judge.
/// `DeserializeOwned` is what the body/query/path decode stages target.
pub trait Bindable: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Domain validation error produced by [`validate`](Bindable::validate).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Domain validation, run after all sources have been merged.
    fn validate(&self) -> Result<(), Self::Error>;

    /// Optional self-describing body for validation failures.
    ///
    /// Returning `None` (the default) hands the error to the active
    /// error formatter; returning `Some(body)` emits `body` verbatim with a
    /// 400 status.
    fn format_validation_error(&self, _err: &Self::Error) -> Option<Value> {
        None
    }
}
