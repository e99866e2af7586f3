use serde_json::Value;

use super::{
    first_count, first_string, first_truthy, number_of, status_text, timestamp_field, truthy,
};
use crate::native::RawRecord;
use crate::types::{JobState, PrintJob};

/// Map a native job status onto `JobState`.
///
/// A record with no status at all is an error; a status that is present
/// but unrecognized is still pending.
pub fn normalize_job_state(raw: Option<&Value>) -> JobState {
    let raw = match raw {
        Some(value) if truthy(value) => value,
        _ => return JobState::Error,
    };

    let state = status_text(raw).to_uppercase();
    let has = |needle: &str| state.contains(needle);

    if has("PRINTING") || has("PROCESSING") {
        JobState::Printing
    } else if has("COMPLETED") || has("PRINTED") {
        JobState::Completed
    } else if has("CANCELLED") || has("CANCELED") {
        JobState::Canceled
    } else if has("PAUSED") {
        JobState::Paused
    } else if has("PENDING") || has("WAITING") {
        JobState::Pending
    } else if has("ERROR") || has("ABORTED") {
        JobState::Error
    } else {
        JobState::Pending
    }
}

pub fn normalize_job_status(raw: &RawRecord) -> PrintJob {
    PrintJob {
        id: first_count(raw, &["id", "jobId"]).unwrap_or(0),
        state: normalize_job_state(first_truthy(raw, &["status", "state"])),
        printer: first_string(raw, &["printer", "printerName"]),
        title: first_string(raw, &["title", "name", "docname"]),
        user: first_string(raw, &["user", "username"]),
        creation_time: timestamp_field(raw, "creationTime"),
        processing_time: timestamp_field(raw, "processingTime"),
        completed_time: timestamp_field(raw, "completedTime"),
        pages: first_count(raw, &["pages", "totalPages"]),
        size: first_count(raw, &["size", "dataSize"]),
    }
}

/// Keep only the print options the native layer understands.
///
/// Unknown or mistyped fields are dropped without error. `jobName` is
/// renamed to `docname`.
pub fn validate_and_normalize_print_options(options: &Value) -> RawRecord {
    let mut normalized = RawRecord::new();
    let options = match options.as_object() {
        Some(options) => options,
        None => return normalized,
    };

    if let Some(copies) = options
        .get("copies")
        .filter(|v| v.is_number())
        .and_then(number_of)
        .filter(|n| *n > 0.0)
        .map(f64::floor)
        .filter(|n| *n >= 1.0)
    {
        normalized.insert("copies".to_string(), Value::from(copies as u64));
    }

    for key in ["duplex", "color"] {
        if let Some(Value::Bool(b)) = options.get(key) {
            normalized.insert(key.to_string(), Value::Bool(*b));
        }
    }

    if let Some(Value::String(size)) = options.get("paperSize") {
        if !size.is_empty() {
            normalized.insert("paperSize".to_string(), Value::String(size.clone()));
        }
    }

    if let Some(orientation) = options.get("orientation").and_then(Value::as_str) {
        if orientation == "portrait" || orientation == "landscape" {
            normalized.insert("orientation".to_string(), Value::from(orientation));
        }
    }

    if let Some(Value::String(name)) = options.get("jobName") {
        if !name.is_empty() {
            normalized.insert("docname".to_string(), Value::String(name.clone()));
        }
    }

    normalized
}
