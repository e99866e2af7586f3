use serde_json::Value;

use super::{first_string, status_text, string_of, truthy};
use crate::native::RawRecord;
use crate::types::{PrintFormat, Printer, PrinterCapabilities, PrinterState};

/// Map a native printer status onto `PrinterState`.
///
/// Windows reports an array of status tokens, CUPS a single string. Both
/// are checked case-insensitively in the same priority order, first hit
/// wins. Tokens are compared whole; strings by substring, which means any
/// string containing "AVAILABLE" reads as offline. A missing status is
/// offline too.
pub fn normalize_printer_state(raw: Option<&Value>) -> PrinterState {
    let raw = match raw {
        Some(value) if truthy(value) => value,
        _ => return PrinterState::Offline,
    };

    if let Value::Array(items) = raw {
        let tokens: Vec<String> = items
            .iter()
            .filter_map(string_of)
            .map(|t| t.trim().to_uppercase())
            .collect();
        let has = |token: &str| tokens.iter().any(|t| t == token);

        return if has("PRINTING") || has("PROCESSING") {
            PrinterState::Printing
        } else if has("PAUSED") || has("STOPPED") {
            PrinterState::Stopped
        } else if has("ERROR") || has("PAPER-JAM") || has("NO-TONER") {
            PrinterState::Error
        } else if has("OFFLINE") || has("NOT-AVAILABLE") {
            PrinterState::Offline
        } else {
            PrinterState::Idle
        };
    }

    let status = status_text(raw).to_uppercase();
    let has = |needle: &str| status.contains(needle);

    if has("PRINTING") || has("PROCESSING") {
        PrinterState::Printing
    } else if has("PAUSED") || has("STOPPED") {
        PrinterState::Stopped
    } else if has("ERROR") || has("JAM") || has("TONER") {
        PrinterState::Error
    } else if has("OFFLINE") || has("AVAILABLE") {
        PrinterState::Offline
    } else {
        PrinterState::Idle
    }
}

pub fn normalize_printer(raw: &RawRecord) -> Printer {
    Printer {
        name: first_string(raw, &["name"]).unwrap_or_default(),
        is_default: raw.get("isDefault").map(truthy).unwrap_or(false),
        state: normalize_printer_state(raw.get("status")),
        location: first_string(raw, &["location"]),
        description: first_string(raw, &["description", "comment"]),
        capabilities: None,
    }
}

fn flag(raw: &RawRecord, keys: &[&str]) -> bool {
    keys.iter().any(|key| raw.get(*key).map(truthy).unwrap_or(false))
}

fn supported(value: &Value) -> bool {
    matches!(value, Value::Bool(true)) || value.as_str() == Some("supported")
}

/// Build capabilities from a merged driver-options/format record.
pub fn normalize_capabilities(raw: &RawRecord) -> PrinterCapabilities {
    let mut formats = vec![PrintFormat::Raw];

    if flag(raw, &["pdf", "PDF"]) {
        formats.push(PrintFormat::Pdf);
    }
    if flag(raw, &["text", "TEXT"]) {
        formats.push(PrintFormat::Text);
    }
    if flag(raw, &["image", "IMAGE", "jpeg", "jpg"]) {
        formats.push(PrintFormat::Image);
    }

    PrinterCapabilities {
        formats,
        paper_sizes: paper_sizes(raw),
        duplex: raw.get("duplex").map(supported),
        color: raw.get("color").map(supported),
    }
}

fn paper_sizes(raw: &RawRecord) -> Option<Vec<String>> {
    if let Some(Value::Array(sizes)) = raw.get("paperSizes") {
        return Some(sizes.iter().filter_map(string_of).collect());
    }
    match raw.get("PageSize") {
        Some(Value::Object(sizes)) if !sizes.is_empty() => Some(sizes.keys().cloned().collect()),
        _ => None,
    }
}

/// Merge the system-wide format list into a printer's driver options.
///
/// Each listed format sets its lower-case flag unless the driver options
/// already say something about it. The list itself is kept under `formats`.
pub fn merge_capability_record(formats: &[String], driver_options: RawRecord) -> RawRecord {
    let mut merged = driver_options;
    for format in formats {
        merged
            .entry(format.to_lowercase())
            .or_insert(Value::Bool(true));
    }
    merged.insert(
        "formats".to_string(),
        Value::Array(formats.iter().cloned().map(Value::String).collect()),
    );
    merged
}

/// The `PageSize` entry flagged as selected; empty when none is.
pub fn selected_paper_size(driver_options: &RawRecord) -> String {
    match driver_options.get("PageSize") {
        Some(Value::Object(sizes)) => sizes
            .iter()
            .filter(|(_, selected)| truthy(selected))
            .map(|(size, _)| size.clone())
            .last()
            .unwrap_or_default(),
        _ => String::new(),
    }
}
