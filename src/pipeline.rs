//! The binding pipeline: decode, context-merge, extract, validate.
//!
//! Each stage merges into a single JSON object accumulator seeded with the
//! DTO's zero-valued form, and the first failing stage short-circuits the
//! rest. Body, query and path decode faults are the caller's (400); a
//! context value of the wrong shape or a DTO that is not an object is a
//! server fault (500). Validation runs last, over the fully merged DTO.

use std::collections::HashSet;

use http::StatusCode;
use serde_json::{Map, Value};

use crate::bind::ResolutionPlan;
use crate::context::BindValues;
use crate::error::{BindError, Rejection};
use crate::format::Formatters;
use crate::request::Bindable;

/// What to do when structural binding is requested but the body is empty.
///
/// The absent-body case has two defensible readings; `Skip` treats it as
/// "nothing to merge" and is the default, `Decode` feeds the empty buffer to
/// the JSON decoder and reports the resulting parse error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyBodyPolicy {
    #[default]
    Skip,
    Decode,
}

/// The raw per-request inputs the adapter hands to the pipeline.
pub(crate) struct RawRequest<'a> {
    pub query: Option<&'a str>,
    pub path_params: &'a [(String, String)],
    pub body: &'a [u8],
    pub context: Option<&'a BindValues>,
}

/// Run the full pipeline for one request.
///
/// Returns the populated, validated DTO, or the first failure already
/// formatted through `formatters` (or the DTO's own validation formatter).
pub(crate) fn bind_dto<T: Bindable>(
    plan: &ResolutionPlan,
    raw: &RawRequest<'_>,
    policy: EmptyBodyPolicy,
    formatters: &Formatters,
) -> Result<T, Rejection> {
    let mut acc = seed::<T>().map_err(|err| reject(&err, formatters))?;
    // Keys whose values arrived as raw strings (query/path) and may need
    // scalar coercion at extraction.
    let mut stringly: HashSet<String> = HashSet::new();

    if plan.body && (!raw.body.is_empty() || policy == EmptyBodyPolicy::Decode) {
        merge_body(&mut acc, raw.body).map_err(|err| reject(&err, formatters))?;
    }

    if plan.query {
        if let Some(query) = raw.query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                stringly.insert(key.to_string());
                acc.insert(key.into_owned(), Value::String(value.into_owned()));
            }
        }
    }

    if plan.path {
        for (key, value) in raw.path_params {
            stringly.insert(key.clone());
            acc.insert(key.clone(), Value::String(value.clone()));
        }
    }

    for key in &plan.context_keys {
        match raw.context.and_then(|values| values.get(key)) {
            None => {
                tracing::warn!(key = %key, "context bind key not set, skipping");
            }
            Some(Value::Object(fields)) => {
                for (field, value) in fields {
                    acc.insert(field.clone(), value.clone());
                }
            }
            Some(other) => {
                tracing::error!(key = %key, kind = value_kind(other), "context bind value is not an object");
                let err = BindError::ContextShape { key: key.clone() };
                return Err(reject(&err, formatters));
            }
        }
    }

    let dto = extract::<T>(acc, &stringly).map_err(|err| reject(&err, formatters))?;

    if let Err(err) = dto.validate() {
        let body = dto
            .format_validation_error(&err)
            .unwrap_or_else(|| (formatters.error)(&err));
        return Err(Rejection {
            status: StatusCode::BAD_REQUEST,
            body,
        });
    }

    Ok(dto)
}

fn reject(err: &BindError, formatters: &Formatters) -> Rejection {
    Rejection {
        status: err.status(),
        body: (formatters.error)(err),
    }
}

/// The zero-valued DTO as a JSON object, the merge baseline.
fn seed<T: Bindable>() -> Result<Map<String, Value>, BindError> {
    match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(BindError::NonStructDto),
    }
}

fn merge_body(acc: &mut Map<String, Value>, body: &[u8]) -> Result<(), BindError> {
    let parsed: Value =
        serde_json::from_slice(body).map_err(|err| BindError::Body(err.to_string()))?;
    match parsed {
        Value::Object(fields) => {
            for (key, value) in fields {
                acc.insert(key, value);
            }
            Ok(())
        }
        other => Err(BindError::Body(format!(
            "expected a JSON object, got {}",
            value_kind(&other)
        ))),
    }
}

/// Deserialize the accumulator into the DTO.
///
/// Query and path parameters arrive as strings. When the direct attempt
/// fails because the decoder rejected one of those strings, that key is
/// coerced to the closest JSON scalar and the attempt repeats, one key per
/// round. Keys the decoder accepts as strings are never touched, so a
/// string-typed field holding numeric-looking text keeps its text. The
/// first error is reported when no assignment works, since it names the
/// offending value.
fn extract<T: Bindable>(
    acc: Map<String, Value>,
    stringly: &HashSet<String>,
) -> Result<T, BindError> {
    let first = match serde_json::from_value(Value::Object(acc.clone())) {
        Ok(dto) => return Ok(dto),
        Err(err) => err,
    };
    if stringly.is_empty() {
        return Err(BindError::Mismatch(first.to_string()));
    }

    let mut keys: Vec<&String> = stringly.iter().collect();
    keys.sort();

    let mut current = acc;
    let mut last = first.to_string();
    for _ in 0..keys.len() {
        let Some(key) = rejected_string_key(&last, &current, &keys) else {
            break;
        };
        let scalar = match current.get(&key) {
            Some(Value::String(s)) => scalar_from_str(s),
            _ => None,
        };
        let Some(scalar) = scalar else {
            break;
        };
        current.insert(key, scalar);
        match serde_json::from_value(Value::Object(current.clone())) {
            Ok(dto) => return Ok(dto),
            Err(err) => last = err.to_string(),
        }
    }
    Err(BindError::Mismatch(first.to_string()))
}

/// The stringly key whose current value the decoder just rejected, going by
/// the value quoted in the error (`invalid type: string "7", expected i64`).
fn rejected_string_key(
    err: &str,
    current: &Map<String, Value>,
    keys: &[&String],
) -> Option<String> {
    let quoted = err.split("string \"").nth(1)?.split('"').next()?;
    keys.iter()
        .find(|key| matches!(current.get(key.as_str()), Some(Value::String(s)) if s == quoted))
        .map(|key| (*key).clone())
}

fn scalar_from_str(s: &str) -> Option<Value> {
    match s {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => s
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| s.parse::<u64>().ok().map(Value::from))
            .or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::from)
            }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindSource;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("expected name")]
    struct MissingName;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Widget {
        name: String,
        #[serde(default)]
        count: i64,
    }

    impl Bindable for Widget {
        type Error = MissingName;

        fn validate(&self) -> Result<(), MissingName> {
            if self.name.is_empty() {
                Err(MissingName)
            } else {
                Ok(())
            }
        }
    }

    fn raw<'a>(body: &'a [u8], query: Option<&'a str>) -> RawRequest<'a> {
        RawRequest {
            query,
            path_params: &[],
            body,
            context: None,
        }
    }

    fn bind_all() -> ResolutionPlan {
        ResolutionPlan::resolve(&[])
    }

    #[test]
    fn body_and_query_merge_additively() {
        let dto: Widget = bind_dto(
            &bind_all(),
            &raw(br#"{"name":"ok"}"#, Some("count=5")),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.name, "ok");
        assert_eq!(dto.count, 5);
    }

    #[test]
    fn query_does_not_clobber_body_fields_it_omits() {
        let dto: Widget = bind_dto(
            &bind_all(),
            &raw(br#"{"name":"from-body","count":2}"#, Some("")),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.name, "from-body");
        assert_eq!(dto.count, 2);
    }

    #[test]
    fn malformed_body_short_circuits_before_validation() {
        // The body is malformed AND the name would fail validation; the
        // reported error must be the decode error.
        let rejection = bind_dto::<Widget>(
            &bind_all(),
            &raw(b"false", None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        let data = rejection.body["data"].as_str().unwrap();
        assert!(data.contains("request body"), "got: {data}");
    }

    #[test]
    fn context_only_mode_ignores_a_malformed_body() {
        let mut values = BindValues::new();
        values.insert_value("identity", json!({"name": "from-ctx"}));
        let raw = RawRequest {
            query: None,
            path_params: &[],
            body: b"{not json",
            context: Some(&values),
        };
        let plan = ResolutionPlan::resolve(&[BindSource::context("identity")]);
        let dto: Widget =
            bind_dto(&plan, &raw, EmptyBodyPolicy::Skip, &Formatters::default()).unwrap();
        assert_eq!(dto.name, "from-ctx");
    }

    #[test]
    fn missing_context_key_is_skipped_not_fatal() {
        let plan = ResolutionPlan::resolve(&[BindSource::Body, BindSource::context("absent")]);
        let dto: Widget = bind_dto(
            &plan,
            &raw(br#"{"name":"ok"}"#, None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.name, "ok");
    }

    #[test]
    fn non_object_context_value_is_a_server_fault() {
        let mut values = BindValues::new();
        values.insert_value("identity", json!("just a string"));
        let raw = RawRequest {
            query: None,
            path_params: &[],
            body: &[],
            context: Some(&values),
        };
        let plan = ResolutionPlan::resolve(&[BindSource::context("identity")]);
        let rejection = bind_dto::<Widget>(
            &plan,
            &raw,
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_body_skips_silently_by_default() {
        let rejection = bind_dto::<Widget>(
            &bind_all(),
            &raw(&[], None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        // Reaches validation, which fails on the empty name.
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.body, json!({"data": "expected name", "message": "Error"}));
    }

    #[test]
    fn empty_body_errors_under_decode_policy() {
        let rejection = bind_dto::<Widget>(
            &bind_all(),
            &raw(&[], None),
            EmptyBodyPolicy::Decode,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        let data = rejection.body["data"].as_str().unwrap();
        assert!(data.contains("request body"), "got: {data}");
    }

    #[test]
    fn path_params_coerce_into_numeric_fields() {
        let params = vec![("count".to_string(), "42".to_string())];
        let raw = RawRequest {
            query: None,
            path_params: &params,
            body: br#"{"name":"ok"}"#,
            context: None,
        };
        let dto: Widget = bind_dto(
            &bind_all(),
            &raw,
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.count, 42);
    }

    #[test]
    fn numeric_string_field_keeps_its_text_when_a_sibling_coerces() {
        // name is string-typed but holds digits; only count may be coerced.
        let params = vec![("name".to_string(), "42".to_string())];
        let raw = RawRequest {
            query: Some("count=7"),
            path_params: &params,
            body: &[],
            context: None,
        };
        let dto: Widget = bind_dto(
            &bind_all(),
            &raw,
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.name, "42");
        assert_eq!(dto.count, 7);
    }

    #[test]
    fn multiple_query_fields_coerce_independently() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Gadget {
            name: String,
            count: i64,
            active: bool,
        }

        impl Bindable for Gadget {
            type Error = MissingName;

            fn validate(&self) -> Result<(), MissingName> {
                Ok(())
            }
        }

        let dto: Gadget = bind_dto(
            &bind_all(),
            &raw(&[], Some("name=17&count=5&active=true")),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap();
        assert_eq!(dto.name, "17");
        assert_eq!(dto.count, 5);
        assert!(dto.active);
    }

    #[test]
    fn type_mismatch_reports_a_client_error() {
        let rejection = bind_dto::<Widget>(
            &bind_all(),
            &raw(br#"{"name":"ok","count":"not-a-number"}"#, None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dto_validation_formatter_overrides_the_global_one() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct SelfDescribing {
            name: String,
        }

        impl Bindable for SelfDescribing {
            type Error = MissingName;

            fn validate(&self) -> Result<(), MissingName> {
                if self.name.is_empty() {
                    Err(MissingName)
                } else {
                    Ok(())
                }
            }

            fn format_validation_error(&self, err: &MissingName) -> Option<Value> {
                Some(json!({"err": err.to_string()}))
            }
        }

        let rejection = bind_dto::<SelfDescribing>(
            &bind_all(),
            &raw(b"{}", None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.body, json!({"err": "expected name"}));
    }

    #[test]
    fn non_struct_dto_is_a_server_fault() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Scalar(i64);

        impl Bindable for Scalar {
            type Error = MissingName;

            fn validate(&self) -> Result<(), MissingName> {
                Ok(())
            }
        }

        let rejection = bind_dto::<Scalar>(
            &bind_all(),
            &raw(&[], None),
            EmptyBodyPolicy::Skip,
            &Formatters::default(),
        )
        .unwrap_err();
        assert_eq!(rejection.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
