//! Decode policy: raw agent text into the spec's requested structured form.
//!
//! The chain tries candidates in order, first success wins:
//! 1. strict JSON (`serde_json`), after stripping markdown code fences;
//! 2. a permissive literal parse for Python-style output.
//!
//! Neither step ever evaluates the input as code. When both fail, the result
//! degrades to raw-only with an explicit [`DecodeStatus::Failed`]: never a
//! silent drop, never an error.

mod lenient;

use serde_json::{Map, Value};

use crate::domain::output::{DecodeStatus, StructuredValue};
use crate::domain::spec::TaskSpec;

/// Structured payloads recovered from one raw result.
#[derive(Debug)]
pub struct Reconciled {
    pub json_dict: Option<Map<String, Value>>,
    pub structured: Option<StructuredValue>,
    pub status: DecodeStatus,
}

/// Reconcile a raw agent result against the spec's output-format intent.
///
/// Pure: no side effects, no retries, the raw string is never modified.
///
/// Assignment rules:
/// - raw-only specs skip decoding entirely (`DecodeStatus::Skipped`);
/// - a typed structured object is attempted first when requested;
/// - otherwise (or when the typed constructor rejects the value) a decoded
///   mapping lands in `json_dict`. This is the documented downgrade: callers
///   that asked for a typed object may receive an untyped mapping instead
///   and must check which field is populated.
pub fn reconcile(raw: &str, spec: &TaskSpec) -> Reconciled {
    if !spec.expect_json && !spec.expect_structured {
        return Reconciled {
            json_dict: None,
            structured: None,
            status: DecodeStatus::Skipped,
        };
    }

    let Some(value) = decode_chain(raw) else {
        return Reconciled {
            json_dict: None,
            structured: None,
            status: DecodeStatus::Failed,
        };
    };

    let mut structured = None;
    if spec.expect_structured
        && let Some(decoder) = spec.decoder()
    {
        structured = decoder.decode_value(value.clone());
    }

    let mut json_dict = None;
    if structured.is_none()
        && let Value::Object(map) = value
    {
        json_dict = Some(map);
    }

    let status = if structured.is_some() || json_dict.is_some() {
        DecodeStatus::Decoded
    } else {
        DecodeStatus::Failed
    };

    Reconciled {
        json_dict,
        structured,
        status,
    }
}

fn decode_chain(raw: &str) -> Option<Value> {
    let candidate = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }
    lenient::parse(candidate)
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
