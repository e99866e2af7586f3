// Canonical and legacy data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::native::RawRecord;

// ============================================================================
// Printers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterState {
    Idle,
    Printing,
    Stopped,
    Offline,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrintFormat {
    Raw,
    Pdf,
    Text,
    Image,
}

impl PrintFormat {
    /// Spelling the native layer uses for the document type.
    pub fn as_native(&self) -> &'static str {
        match self {
            PrintFormat::Raw => "RAW",
            PrintFormat::Pdf => "PDF",
            PrintFormat::Text => "TEXT",
            PrintFormat::Image => "IMAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterCapabilities {
    /// Always starts with `Raw`, no duplicates.
    pub formats: Vec<PrintFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_sizes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub name: String,
    pub is_default: bool,
    pub state: PrinterState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only filled by a single-printer lookup, and only when the
    /// capability query succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<PrinterCapabilities>,
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Printing,
    Completed,
    Canceled,
    Paused,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: u64,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobResult {
    pub id: u64,
    pub printer: String,
}

/// Job control verbs accepted by `Jobs::set_native`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobCommand {
    Pause,
    Resume,
    Cancel,
}

impl JobCommand {
    /// Upper-case spelling, the form the legacy surface documents.
    pub fn as_upper(&self) -> &'static str {
        match self {
            JobCommand::Pause => "PAUSE",
            JobCommand::Resume => "RESUME",
            JobCommand::Cancel => "CANCEL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Typed builder for the loosely typed options object the job facade
/// accepts. Serializes to the same field names callers would send by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
}

impl PrintOptions {
    pub fn into_value(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Input of `Jobs::print_file`.
#[derive(Debug, Clone, Default)]
pub struct PrintFileOptions {
    pub printer: String,
    pub file: String,
    /// Untyped options; see `normalize::validate_and_normalize_print_options`.
    pub options: serde_json::Value,
}

/// Input of `Jobs::print_raw`.
#[derive(Debug, Clone, Default)]
pub struct PrintRawOptions {
    pub printer: String,
    pub data: bytes::Bytes,
    /// Defaults to `PrintFormat::Raw`.
    pub format: Option<PrintFormat>,
    pub options: serde_json::Value,
}

// ============================================================================
// Legacy model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDetails {
    pub name: String,
    pub is_default: bool,
    pub options: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobDetails>>,
    /// Fields the native layer reported that have no named slot here.
    #[serde(flatten)]
    pub extra: RawRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub id: u64,
    pub name: Option<String>,
    pub printer_name: Option<String>,
    pub user: Option<String>,
    pub format: Option<String>,
    pub priority: Option<i64>,
    pub size: Option<u64>,
    pub status: Vec<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub processing_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: RawRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_serializes_camel_case() {
        let printer = Printer {
            name: "HP".to_string(),
            is_default: true,
            state: PrinterState::Offline,
            location: None,
            description: Some("Office".to_string()),
            capabilities: None,
        };
        let json = serde_json::to_value(&printer).unwrap();
        assert_eq!(json["isDefault"], true);
        assert_eq!(json["state"], "offline");
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_print_options_into_value() {
        let value = PrintOptions {
            copies: Some(2),
            job_name: Some("report".to_string()),
            orientation: Some(Orientation::Landscape),
            ..Default::default()
        }
        .into_value();
        assert_eq!(value["copies"], 2);
        assert_eq!(value["jobName"], "report");
        assert_eq!(value["orientation"], "landscape");
        assert!(value.get("duplex").is_none());
    }

    #[test]
    fn test_job_command_upper() {
        assert_eq!(JobCommand::Pause.as_upper(), "PAUSE");
        assert_eq!(JobCommand::Cancel.as_upper(), "CANCEL");
    }
}
