// Data normalization: raw native records -> canonical and legacy shapes
//
// Native records arrive as loosely typed JSON. Field lookups follow the
// truthiness rules of the records' producers: null, false, 0, NaN and the
// empty string count as absent.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::native::RawRecord;

mod jobs;
mod legacy;
mod printers;

pub use jobs::{normalize_job_state, normalize_job_status, validate_and_normalize_print_options};
pub use legacy::{legacy_job, legacy_printer};
pub use printers::{
    merge_capability_record, normalize_capabilities, normalize_printer, normalize_printer_state,
    selected_paper_size,
};

/// Convert epoch seconds to an absolute time. Zero means "never" and gives `None`.
pub fn timestamp_from_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if secs == 0.0 || !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

pub fn to_epoch_seconds(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp()
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First truthy value among `keys`, in order.
pub(crate) fn first_truthy<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| truthy(value))
}

pub(crate) fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn first_string(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    first_truthy(raw, keys).and_then(string_of)
}

pub(crate) fn first_count(raw: &RawRecord, keys: &[&str]) -> Option<u64> {
    first_truthy(raw, keys)
        .and_then(number_of)
        .filter(|n| *n > 0.0)
        .map(|n| n.floor() as u64)
}

/// Timestamp field, present only when the raw value is truthy.
pub(crate) fn timestamp_field(raw: &RawRecord, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key)
        .filter(|value| truthy(value))
        .and_then(number_of)
        .and_then(timestamp_from_seconds)
}

/// Text form of a status value; arrays are comma-joined.
pub(crate) fn status_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| string_of(item).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(","),
        other => string_of(other).unwrap_or_else(|| other.to_string()),
    }
}
