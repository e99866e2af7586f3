use async_trait::async_trait;
use printers::common::base::job::{PrinterJob, PrinterJobOptions};
use printers::common::base::printer::Printer;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use super::{DirectRequest, FileRequest, NativePrinting, NativeResult, RawRecord};

const FORMATS: &[&str] = &["RAW", "TEXT", "PDF", "JPEG", "POSTSCRIPT", "COMMAND", "AUTO"];
const COMMANDS: &[&str] = &["CANCEL", "PAUSE", "RESUME"];

/// CUPS or Winspool through the `printers` crate.
///
/// The crate's calls block, so each one runs on the blocking pool.
#[derive(Debug, Default)]
pub struct SystemNative;

impl SystemNative {
    pub fn new() -> Self {
        Self
    }
}

async fn blocking<T, F>(f: F) -> NativeResult<T>
where
    F: FnOnce() -> NativeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn lookup(name: Option<&str>) -> NativeResult<Printer> {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => printers::get_printer_by_name(name)
            .ok_or_else(|| format!("printer not found: {}", name).into()),
        None => printers::get_default_printer()
            .ok_or_else(|| "no default printer available".into()),
    }
}

fn epoch_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn job_record(printer: &str, job: &PrinterJob) -> Value {
    json!({
        "id": job.id,
        "name": job.name,
        "printerName": printer,
        "status": [format!("{:?}", job.state).to_uppercase()],
        "creationTime": epoch_seconds(job.created_at),
        "processingTime": 0,
        "completedTime": 0
    })
}

fn printer_record(printer: &Printer) -> RawRecord {
    let jobs: Vec<Value> = printer
        .get_active_jobs()
        .iter()
        .map(|job| job_record(&printer.name, job))
        .collect();

    let record = json!({
        "name": printer.name,
        "isDefault": printer.is_default,
        "status": format!("{:?}", printer.state).to_uppercase(),
        "description": printer.description,
        "location": printer.location,
        "options": {
            "printer-uri": printer.uri,
            "system-name": printer.system_name
        },
        "jobs": jobs
    });

    match record {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

/// Document type to the MIME type CUPS expects. Winspool ignores it.
fn document_format(format: &str) -> Option<&'static str> {
    match format {
        "TEXT" => Some("text/plain"),
        "PDF" => Some("application/pdf"),
        "JPEG" | "IMAGE" => Some("image/jpeg"),
        "POSTSCRIPT" => Some("application/postscript"),
        "RAW" | "COMMAND" => Some("application/vnd.cups-raw"),
        _ => None,
    }
}

fn properties(options: &RawRecord) -> Vec<(String, String)> {
    options
        .iter()
        .filter(|(key, _)| key.as_str() != "docname")
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

fn submit<F>(docname: &str, props: &[(String, String)], send: F) -> NativeResult<i64>
where
    F: FnOnce(PrinterJobOptions) -> NativeResult<u64>,
{
    let raw: Vec<(&str, &str)> = props
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let options = PrinterJobOptions {
        name: Some(docname),
        raw_properties: &raw,
    };
    let id = send(options)?;
    Ok(id as i64)
}

#[async_trait]
impl NativePrinting for SystemNative {
    async fn get_printers(&self) -> NativeResult<Vec<RawRecord>> {
        blocking(|| {
            let found = printers::get_printers();
            debug!("System reports {} printers", found.len());
            Ok(found.iter().map(printer_record).collect())
        })
        .await
    }

    async fn get_printer(&self, name: Option<&str>) -> NativeResult<RawRecord> {
        let name = name.map(str::to_string);
        blocking(move || lookup(name.as_deref()).map(|p| printer_record(&p))).await
    }

    async fn get_default_printer_name(&self) -> NativeResult<Option<String>> {
        blocking(|| Ok(printers::get_default_printer().map(|p| p.name))).await
    }

    async fn get_printer_driver_options(&self, name: Option<&str>) -> NativeResult<RawRecord> {
        let name = name.map(str::to_string);
        // The printers crate exposes no PPD/DEVMODE options.
        blocking(move || lookup(name.as_deref()).map(|_| RawRecord::new())).await
    }

    async fn print_direct(&self, request: DirectRequest) -> NativeResult<i64> {
        blocking(move || {
            let printer = lookup(Some(&request.printer))?;
            let mut props = properties(&request.options);
            if let Some(mime) = document_format(&request.format) {
                props.push(("document-format".to_string(), mime.to_string()));
            }

            let id = submit(&request.docname, &props, |options| {
                printer
                    .print(&request.data, options)
                    .map_err(|e| format!("{}", e).into())
            })?;
            info!("Submitted {} bytes to {} as job {}", request.data.len(), printer.name, id);
            Ok(id)
        })
        .await
    }

    async fn print_file(&self, request: FileRequest) -> NativeResult<i64> {
        blocking(move || {
            if !std::path::Path::new(&request.filename).exists() {
                return Err(format!("file not found: {}", request.filename).into());
            }

            let printer = lookup(request.printer.as_deref())?;
            let docname = request
                .docname
                .clone()
                .unwrap_or_else(|| request.filename.clone());
            let props = properties(&request.options);

            let id = submit(&docname, &props, |options| {
                printer
                    .print_file(&request.filename, options)
                    .map_err(|e| format!("{}", e).into())
            })?;
            info!("Submitted {} to {} as job {}", request.filename, printer.name, id);
            Ok(id)
        })
        .await
    }

    async fn get_job(&self, printer: &str, job_id: u64) -> NativeResult<RawRecord> {
        let name = printer.to_string();
        blocking(move || {
            let printer = lookup(Some(&name))?;
            printer
                .get_active_jobs()
                .iter()
                .find(|job| job.id == job_id)
                .and_then(|job| job_record(&printer.name, job).as_object().cloned())
                .ok_or_else(|| format!("job {} not found", job_id).into())
        })
        .await
    }

    async fn set_job(&self, printer: &str, job_id: u64, command: &str) -> NativeResult<Value> {
        let name = printer.to_string();
        let command = command.to_uppercase();
        blocking(move || {
            let printer = lookup(Some(&name))?;
            let result = match command.as_str() {
                "CANCEL" => printer.cancel_job(job_id),
                "PAUSE" => printer.pause_job(job_id),
                "RESUME" => printer.resume_job(job_id),
                other => return Err(format!("unsupported job command: {}", other).into()),
            };
            result.map_err(|e| {
                warn!("{} of job {} on {} failed: {}", command, job_id, name, e);
                format!("{}", e)
            })?;
            Ok(Value::Bool(true))
        })
        .await
    }

    async fn get_supported_print_formats(&self) -> NativeResult<Vec<String>> {
        Ok(FORMATS.iter().map(|s| s.to_string()).collect())
    }

    async fn get_supported_job_commands(&self) -> NativeResult<Vec<String>> {
        Ok(COMMANDS.iter().map(|s| s.to_string()).collect())
    }

    fn type_name(&self) -> &'static str {
        "System Printing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_format() {
        assert_eq!(document_format("PDF"), Some("application/pdf"));
        assert_eq!(document_format("AUTO"), None);
    }

    #[test]
    fn test_properties_skip_docname() {
        let options = json!({"copies": 2, "docname": "x", "paperSize": "A4"});
        let props = properties(options.as_object().unwrap());
        assert_eq!(
            props,
            vec![
                ("copies".to_string(), "2".to_string()),
                ("paperSize".to_string(), "A4".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_static_lists() {
        let native = SystemNative::new();
        assert!(native
            .get_supported_job_commands()
            .await
            .unwrap()
            .contains(&"CANCEL".to_string()));
        assert_eq!(native.get_supported_print_formats().await.unwrap()[0], "RAW");
    }
}
