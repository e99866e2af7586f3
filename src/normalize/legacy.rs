use serde_json::Value;
use std::collections::BTreeMap;

use super::{number_of, string_of, timestamp_from_seconds, truthy};
use crate::native::RawRecord;
use crate::types::{JobDetails, PrinterDetails};

fn take_string(raw: &mut RawRecord, key: &str) -> Option<String> {
    raw.remove(key).as_ref().and_then(string_of)
}

fn take_number(raw: &mut RawRecord, key: &str) -> Option<f64> {
    raw.remove(key).as_ref().and_then(number_of)
}

fn take_time(raw: &mut RawRecord, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    take_number(raw, key).and_then(timestamp_from_seconds)
}

/// Legacy printer record. Nested jobs get their timestamps converted;
/// fields without a named slot are carried over as they are.
pub fn legacy_printer(mut raw: RawRecord) -> PrinterDetails {
    let name = take_string(&mut raw, "name").unwrap_or_default();
    let is_default = raw.remove("isDefault").map(|v| truthy(&v)).unwrap_or(false);

    let options = match raw.remove("options") {
        Some(Value::Object(options)) => options
            .into_iter()
            .map(|(key, value)| {
                let text = string_of(&value).unwrap_or_else(|| value.to_string());
                (key, text)
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    let jobs = match raw.remove("jobs") {
        Some(Value::Array(jobs)) => Some(
            jobs.into_iter()
                .filter_map(|job| match job {
                    Value::Object(job) => Some(legacy_job(job)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    };

    PrinterDetails {
        name,
        is_default,
        options,
        jobs,
        extra: raw,
    }
}

pub fn legacy_job(mut raw: RawRecord) -> JobDetails {
    let status = match raw.remove("status") {
        Some(Value::Array(items)) => items.iter().filter_map(string_of).collect(),
        Some(other) => string_of(&other).into_iter().collect(),
        None => Vec::new(),
    };

    JobDetails {
        id: take_number(&mut raw, "id")
            .filter(|n| *n > 0.0)
            .map(|n| n as u64)
            .unwrap_or(0),
        name: take_string(&mut raw, "name"),
        printer_name: take_string(&mut raw, "printerName"),
        user: take_string(&mut raw, "user"),
        format: take_string(&mut raw, "format"),
        priority: take_number(&mut raw, "priority").map(|n| n as i64),
        size: take_number(&mut raw, "size")
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64),
        status,
        creation_time: take_time(&mut raw, "creationTime"),
        processing_time: take_time(&mut raw, "processingTime"),
        completed_time: take_time(&mut raw, "completedTime"),
        extra: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_legacy_printer_with_jobs() {
        let details = legacy_printer(record(json!({
            "name": "HP",
            "isDefault": true,
            "status": "IDLE",
            "options": {"copies": 1, "media": "A4"},
            "jobs": [{
                "id": 5,
                "name": "report",
                "status": ["PRINTING"],
                "creationTime": 1_694_764_800,
                "processingTime": 0
            }]
        })));

        assert_eq!(details.name, "HP");
        assert!(details.is_default);
        assert_eq!(details.options["copies"], "1");
        assert_eq!(details.options["media"], "A4");
        assert_eq!(details.extra["status"], "IDLE");

        let jobs = details.jobs.unwrap();
        assert_eq!(jobs[0].id, 5);
        assert_eq!(jobs[0].status, vec!["PRINTING"]);
        assert_eq!(jobs[0].creation_time.map(|t| t.timestamp()), Some(1_694_764_800));
        assert!(jobs[0].processing_time.is_none());
    }

    #[test]
    fn test_legacy_job_keeps_unknown_fields() {
        let job = legacy_job(record(json!({"id": 2, "status": "PENDING", "pagesPrinted": 4})));
        assert_eq!(job.status, vec!["PENDING"]);
        assert_eq!(job.extra["pagesPrinted"], 4);
        assert!(job.completed_time.is_none());
    }

    #[test]
    fn test_legacy_printer_without_jobs() {
        let details = legacy_printer(record(json!({"name": "Plain"})));
        assert!(details.jobs.is_none());
        assert!(!details.is_default);
        assert!(details.options.is_empty());
    }
}
