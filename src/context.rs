//! Request-scoped values attached by upstream middleware.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// A keyed store of values that middleware attaches to a request for the
/// binding pipeline to copy into DTOs.
///
/// Values are serialized to JSON at insertion, so the context-merge stage
/// deals only in structural data: an object merges field-by-field into the
/// DTO, anything else is reported as a shape fault.
///
/// Middleware inserts the store into request extensions:
///
/// ```rust,ignore
/// let mut values = BindValues::new();
/// values.insert("identity", &identity)?;
/// request.extensions_mut().insert(values);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BindValues {
    values: HashMap<String, Value>,
}

impl BindValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` and store it under `key`, replacing any previous
    /// entry.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: &(impl Serialize + ?Sized),
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Store an already-built JSON value under `key`.
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
