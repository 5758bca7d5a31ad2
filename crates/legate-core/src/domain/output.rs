//! Task results: the agent's verbatim text plus at most one structured form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::ids::TaskId;

/// What the decode step did with the raw result.
///
/// `Failed` and `Skipped` are distinct on purpose: downstream consumers must
/// be able to tell "no structured result" apart from "decode not attempted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecodeStatus {
    /// A structured payload was recovered.
    Decoded,
    /// Decode ran and recovered nothing; only `raw` is populated.
    Failed,
    /// The spec asked for raw output only; decode was not attempted.
    Skipped,
}

/// A type-erased typed output object.
///
/// Holds the concrete value behind `Arc<dyn Any>` together with its declared
/// name so logs and `Debug` stay readable. Recover the concrete type with
/// [`StructuredValue::downcast_ref`].
#[derive(Clone)]
pub struct StructuredValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl StructuredValue {
    pub fn new<T: Send + Sync + 'static>(value: T, type_name: &'static str) -> Self {
        Self {
            inner: Arc::new(value),
            type_name,
        }
    }

    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructuredValue({})", self.type_name)
    }
}

/// Immutable result of one task execution.
///
/// `raw` always equals the agent's returned string exactly, regardless of
/// decode outcome. Depending on the spec's intent and what the decode step
/// could recover, at most one of `json_dict` / `structured` is populated.
///
/// Caller contract: a spec that requested a typed structured object can still
/// receive an untyped mapping in `json_dict` instead, when the raw result
/// decoded to a mapping the typed decoder could not construct. Check which
/// field you actually got.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    task_id: TaskId,
    raw: String,
    json_dict: Option<Map<String, Value>>,
    #[serde(skip)]
    structured: Option<StructuredValue>,
    decode: DecodeStatus,
}

impl TaskOutput {
    pub(crate) fn new(
        task_id: TaskId,
        raw: String,
        json_dict: Option<Map<String, Value>>,
        structured: Option<StructuredValue>,
        decode: DecodeStatus,
    ) -> Self {
        Self {
            task_id,
            raw,
            json_dict,
            structured,
            decode,
        }
    }

    /// The spec this output belongs to (association, not ownership).
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// The agent's verbatim textual result.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn json_dict(&self) -> Option<&Map<String, Value>> {
        self.json_dict.as_ref()
    }

    pub fn structured(&self) -> Option<&StructuredValue> {
        self.structured.as_ref()
    }

    /// Downcast the typed output object, if one was constructed.
    pub fn structured_as<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.structured.as_ref().and_then(StructuredValue::downcast_ref)
    }

    pub fn decode(&self) -> DecodeStatus {
        self.decode
    }

    /// Serialize `json_dict` when present.
    pub fn to_json_string(&self) -> Option<String> {
        self.json_dict
            .as_ref()
            .and_then(|map| serde_json::to_string(map).ok())
    }
}

impl fmt::Display for TaskOutput {
    /// Most-structured-first rendering: the JSON mapping when present,
    /// otherwise the raw text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json_string() {
            Some(json) => f.write_str(&json),
            None => f.write_str(&self.raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_map() -> Map<String, Value> {
        match json!({"a": "x"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn raw_is_always_available() {
        let out = TaskOutput::new(
            TaskId::generate(),
            "not structured at all".to_string(),
            None,
            None,
            DecodeStatus::Failed,
        );
        assert_eq!(out.raw(), "not structured at all");
        assert!(out.json_dict().is_none());
        assert!(out.structured().is_none());
        assert_eq!(out.decode(), DecodeStatus::Failed);
    }

    #[test]
    fn display_prefers_json_dict() {
        let out = TaskOutput::new(
            TaskId::generate(),
            "{\"a\": \"x\"}".to_string(),
            Some(sample_map()),
            None,
            DecodeStatus::Decoded,
        );
        assert_eq!(out.to_string(), "{\"a\":\"x\"}");
    }

    #[test]
    fn structured_value_downcasts_to_its_type() {
        #[derive(Debug, PartialEq)]
        struct Summary {
            text: String,
        }

        let value = StructuredValue::new(
            Summary {
                text: "done".to_string(),
            },
            "Summary",
        );
        assert_eq!(value.type_name(), "Summary");
        assert_eq!(value.downcast_ref::<Summary>().unwrap().text, "done");
        assert!(value.downcast_ref::<String>().is_none());
    }

    #[test]
    fn decode_status_serializes_screaming_snake() {
        let s = serde_json::to_string(&DecodeStatus::Failed).unwrap();
        assert_eq!(s, "\"FAILED\"");
    }
}
