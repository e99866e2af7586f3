use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PrintingConfig;
use crate::errors::{ErrorCode, PrinterError, PrinterResult};
use crate::native::{DirectRequest, FileRequest, NativePrinting, RawRecord};
use crate::normalize::{normalize_job_status, validate_and_normalize_print_options};
use crate::types::{
    JobCommand, PrintFileOptions, PrintFormat, PrintJob, PrintJobResult, PrintRawOptions,
};

/// Job submission, inspection and control.
#[derive(Clone)]
pub struct Jobs {
    native: Arc<dyn NativePrinting>,
    default_docname: String,
}

impl Jobs {
    pub fn new(native: Arc<dyn NativePrinting>) -> Self {
        Self::with_config(native, &PrintingConfig::default())
    }

    pub fn with_config(native: Arc<dyn NativePrinting>, config: &PrintingConfig) -> Self {
        Self {
            native,
            default_docname: config.default_docname.clone(),
        }
    }

    /// Queue a file on `options.printer`.
    pub async fn print_file(&self, options: PrintFileOptions) -> PrinterResult<PrintJobResult> {
        if options.printer.is_empty() || options.file.is_empty() {
            return Err(PrinterError::invalid_arguments(
                "Printer name and file path are required",
            ));
        }

        let native_options = validate_and_normalize_print_options(&options.options);
        let request = FileRequest {
            filename: options.file.clone(),
            docname: docname_of(&native_options),
            printer: Some(options.printer.clone()),
            options: native_options,
        };

        let id = self
            .native
            .print_file(request)
            .await
            .map_err(PrinterError::from_native)?;
        let id = queued_id(id)?;

        info!("Queued file {} on {} as job {}", options.file, options.printer, id);
        Ok(PrintJobResult {
            id,
            printer: options.printer,
        })
    }

    /// Send bytes to `options.printer` as-is. Format defaults to `RAW`.
    pub async fn print_raw(&self, options: PrintRawOptions) -> PrinterResult<PrintJobResult> {
        if options.printer.is_empty() {
            return Err(PrinterError::invalid_arguments("Printer name is required"));
        }

        let native_options = validate_and_normalize_print_options(&options.options);
        let format = options.format.unwrap_or(PrintFormat::Raw);
        let request = DirectRequest {
            data: options.data.clone(),
            printer: options.printer.clone(),
            docname: docname_of(&native_options).unwrap_or_else(|| self.default_docname.clone()),
            format: format.as_native().to_string(),
            options: native_options,
        };

        let id = self
            .native
            .print_direct(request)
            .await
            .map_err(PrinterError::from_native)?;
        let id = queued_id(id)?;

        info!(
            "Queued {} bytes ({}) on {} as job {}",
            options.data.len(),
            format.as_native(),
            options.printer,
            id
        );
        Ok(PrintJobResult {
            id,
            printer: options.printer,
        })
    }

    /// Convenience over `print_raw` for text already in memory.
    pub async fn print_text(&self, printer: &str, text: &str) -> PrinterResult<PrintJobResult> {
        self.print_raw(PrintRawOptions {
            printer: printer.to_string(),
            data: Bytes::copy_from_slice(text.as_bytes()),
            format: Some(PrintFormat::Text),
            options: Value::Null,
        })
        .await
    }

    pub async fn get(&self, printer: &str, job_id: u64) -> PrinterResult<PrintJob> {
        require_job(printer, job_id)?;

        let raw = self
            .native
            .get_job(printer, job_id)
            .await
            .map_err(PrinterError::from_native)?;
        Ok(normalize_job_status(&raw))
    }

    /// Jobs on one printer, or on every printer when `printer` is `None`.
    ///
    /// When listing across printers a queue that cannot be read is logged
    /// and skipped.
    pub async fn list(&self, printer: Option<&str>) -> PrinterResult<Vec<PrintJob>> {
        if let Some(printer) = printer.filter(|p| !p.is_empty()) {
            let raw = self
                .native
                .get_jobs(printer)
                .await
                .map_err(PrinterError::from_native)?;
            return Ok(normalize_queue(printer, &raw));
        }

        let printers = self
            .native
            .get_printers()
            .await
            .map_err(PrinterError::from_native)?;

        let mut jobs = Vec::new();
        for record in &printers {
            let name = match queue_name(record) {
                Some(name) => name,
                None => continue,
            };
            match self.native.get_jobs(name).await {
                Ok(raw) => jobs.extend(normalize_queue(name, &raw)),
                Err(e) => warn!("Failed to get jobs for printer {}: {}", name, e),
            }
        }

        debug!("Listed {} jobs across {} printers", jobs.len(), printers.len());
        Ok(jobs)
    }

    pub async fn cancel(&self, printer: &str, job_id: u64) -> PrinterResult<()> {
        self.set_native(printer, job_id, JobCommand::Cancel).await
    }

    /// Issue a job control command.
    ///
    /// The command is forwarded in the spelling the native layer lists in
    /// its supported commands; the upper-case form is used when it lists
    /// none that match.
    pub async fn set_native(
        &self,
        printer: &str,
        job_id: u64,
        command: JobCommand,
    ) -> PrinterResult<()> {
        require_job(printer, job_id)?;

        let spelled = self.native_spelling(command).await;
        self.native
            .set_job(printer, job_id, &spelled)
            .await
            .map_err(PrinterError::from_native)?;

        info!("Sent {} to job {} on {}", spelled, job_id, printer);
        Ok(())
    }

    async fn native_spelling(&self, command: JobCommand) -> String {
        let wanted = command.as_upper();
        match self.native.get_supported_job_commands().await {
            Ok(supported) => supported
                .into_iter()
                .find(|c| c.eq_ignore_ascii_case(wanted))
                .unwrap_or_else(|| wanted.to_string()),
            Err(e) => {
                debug!("Supported job commands unavailable: {}", e);
                wanted.to_string()
            }
        }
    }
}

fn require_job(printer: &str, job_id: u64) -> PrinterResult<()> {
    if printer.is_empty() || job_id == 0 {
        return Err(PrinterError::invalid_arguments(
            "Valid printer name and job ID are required",
        ));
    }
    Ok(())
}

fn queued_id(id: i64) -> PrinterResult<u64> {
    if id <= 0 {
        return Err(PrinterError::new(ErrorCode::Unknown, "Failed to queue print job"));
    }
    Ok(id as u64)
}

fn docname_of(options: &RawRecord) -> Option<String> {
    options
        .get("docname")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn queue_name(record: &RawRecord) -> Option<&str> {
    ["name", "printer"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|name| !name.is_empty())
}

fn normalize_queue(printer: &str, raw: &[RawRecord]) -> Vec<PrintJob> {
    raw.iter()
        .map(|record| {
            let mut job = normalize_job_status(record);
            if job.printer.is_none() {
                job.printer = Some(printer.to_string());
            }
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::MockNative;
    use crate::types::JobState;
    use serde_json::json;

    fn facade(native: MockNative) -> (Arc<MockNative>, Jobs) {
        let native = Arc::new(native.with_call_log());
        (native.clone(), Jobs::new(native))
    }

    fn lab() -> MockNative {
        MockNative::new()
            .with_printer(json!({"name": "P1", "status": "idle"}))
            .with_printer(json!({"name": "P2", "status": "idle"}))
    }

    #[tokio::test]
    async fn test_print_file_returns_job() {
        let (native, jobs) = facade(lab().with_next_job_id(7));
        let result = jobs
            .print_file(PrintFileOptions {
                printer: "P1".to_string(),
                file: "doc.txt".to_string(),
                options: json!({"copies": 2, "jobName": "Report", "tray": 3}),
            })
            .await
            .unwrap();
        assert_eq!(result, PrintJobResult { id: 7, printer: "P1".to_string() });

        let request = native.last_file().unwrap();
        assert_eq!(request.filename, "doc.txt");
        assert_eq!(request.printer.as_deref(), Some("P1"));
        assert_eq!(request.docname.as_deref(), Some("Report"));
        assert_eq!(Value::Object(request.options), json!({"copies": 2, "docname": "Report"}));
    }

    #[tokio::test]
    async fn test_print_file_requires_printer_and_file() {
        let (native, jobs) = facade(lab());
        let err = jobs
            .print_file(PrintFileOptions {
                printer: "P1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArguments);
        assert!(native.calls().is_empty());
    }

    #[tokio::test]
    async fn test_print_raw_empty_printer() {
        let (native, jobs) = facade(lab());
        let err = jobs
            .print_raw(PrintRawOptions {
                printer: String::new(),
                data: Bytes::from_static(b"\x1b@hello"),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArguments);
        assert_eq!(err.message(), "Printer name is required");
        assert!(native.calls().is_empty());
    }

    #[tokio::test]
    async fn test_print_raw_defaults() {
        let (native, jobs) = facade(lab());
        let result = jobs
            .print_raw(PrintRawOptions {
                printer: "P2".to_string(),
                data: Bytes::from_static(b"^XA^FDlabel^FS^XZ"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.printer, "P2");

        let request = native.last_direct().unwrap();
        assert_eq!(request.format, "RAW");
        assert_eq!(request.docname, "print job");
    }

    #[tokio::test]
    async fn test_print_text() {
        let (native, jobs) = facade(lab());
        jobs.print_text("P1", "hello").await.unwrap();
        let request = native.last_direct().unwrap();
        assert_eq!(request.format, "TEXT");
        assert_eq!(&request.data[..], b"hello");
    }

    #[tokio::test]
    async fn test_non_positive_job_id_is_unknown() {
        for id in [0, -1] {
            let (_, jobs) = facade(lab().with_next_job_id(id));
            let err = jobs
                .print_file(PrintFileOptions {
                    printer: "P1".to_string(),
                    file: "doc.txt".to_string(),
                    options: Value::Null,
                })
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::Unknown);
            assert_eq!(err.message(), "Failed to queue print job");
        }
    }

    #[tokio::test]
    async fn test_native_failure_is_classified() {
        let (_, jobs) = facade(lab());
        let err = jobs
            .print_file(PrintFileOptions {
                printer: "Ghost".to_string(),
                file: "doc.txt".to_string(),
                options: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrinterNotFound);
    }

    #[tokio::test]
    async fn test_get_job() {
        let (_, jobs) = facade(lab().with_job(
            "P1",
            json!({"id": 4, "name": "invoice", "status": ["PRINTING"], "creationTime": 1_694_764_800}),
        ));
        let job = jobs.get("P1", 4).await.unwrap();
        assert_eq!(job.id, 4);
        assert_eq!(job.state, JobState::Printing);
        assert_eq!(job.title.as_deref(), Some("invoice"));

        let err = jobs.get("P1", 5).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::JobNotFound);

        let err = jobs.get("P1", 0).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArguments);
    }

    #[tokio::test]
    async fn test_list_single_printer_fills_printer() {
        let (_, jobs) = facade(lab().with_job("P1", json!({"id": 1, "status": "PENDING"})));
        let list = jobs.list(Some("P1")).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].printer.as_deref(), Some("P1"));
        assert_eq!(list[0].state, JobState::Pending);
    }

    #[tokio::test]
    async fn test_list_all_continues_past_failures() {
        let (native, jobs) = facade(
            lab()
                .with_printer(json!({"status": "idle"}))
                .with_job("P1", json!({"id": 1, "status": "PENDING"}))
                .with_job("P2", json!({"id": 2, "status": "PAUSED", "printerName": "P2"})),
        );
        let list = jobs.list(None).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(native.call_count("get_printer"), 2);

        let (_, jobs) = facade(lab().failing("get_printer", "driver timeout"));
        assert!(jobs.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_uses_native_spelling() {
        let (native, jobs) = facade(
            lab()
                .with_job("P1", json!({"id": 9, "status": "PENDING"}))
                .with_job_commands(&["cancel", "pause", "resume"]),
        );
        jobs.cancel("P1", 9).await.unwrap();
        assert_eq!(native.last_command().as_deref(), Some("cancel"));
        assert_eq!(jobs.get("P1", 9).await.unwrap().state, JobState::Canceled);
    }

    #[tokio::test]
    async fn test_set_native_falls_back_to_upper_case() {
        let (native, jobs) = facade(
            lab()
                .with_job("P1", json!({"id": 9, "status": "PENDING"}))
                .failing("get_supported_job_commands", "not supported"),
        );
        jobs.set_native("P1", 9, JobCommand::Pause).await.unwrap();
        assert_eq!(native.last_command().as_deref(), Some("PAUSE"));
        assert_eq!(jobs.get("P1", 9).await.unwrap().state, JobState::Paused);
    }

    #[tokio::test]
    async fn test_set_native_validates_first() {
        let (native, jobs) = facade(lab());
        let err = jobs.set_native("", 3, JobCommand::Resume).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArguments);
        assert!(native.calls().is_empty());
    }
}
