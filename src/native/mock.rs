use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{DirectRequest, FileRequest, NativePrinting, NativeResult, PrintFileForm, RawRecord};

const DEFAULT_FORMATS: &[&str] = &["RAW", "TEXT", "PDF", "JPEG", "POSTSCRIPT", "COMMAND", "AUTO"];
const DEFAULT_COMMANDS: &[&str] = &["CANCEL", "PAUSE", "RESUME"];
const DEMO_JOB_LIMIT: usize = 64;

#[derive(Debug)]
struct MockState {
    printers: Vec<RawRecord>,
    default_printer: Option<String>,
    driver_options: HashMap<String, RawRecord>,
    formats: Vec<String>,
    commands: Vec<String>,
    failures: HashMap<String, String>,
    next_job_id: i64,
    check_files: bool,
    job_limit: Option<usize>,
    call_log: Option<Vec<String>>,
    last_direct: Option<DirectRequest>,
    last_file: Option<FileRequest>,
    last_command: Option<String>,
}

/// In-memory collaborator.
///
/// Jobs live in the `jobs` array of their printer record, so printer
/// lookups and job lookups always agree. Any method can be made to fail
/// with `failing`.
///
/// Nothing accumulates unless asked for: the call log is opt-in through
/// `with_call_log`, and `with_job_limit` bounds each printer's queue.
#[derive(Debug)]
pub struct MockNative {
    state: Mutex<MockState>,
    form: PrintFileForm,
}

impl Default for MockNative {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNative {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                printers: Vec::new(),
                default_printer: None,
                driver_options: HashMap::new(),
                formats: DEFAULT_FORMATS.iter().map(|s| s.to_string()).collect(),
                commands: DEFAULT_COMMANDS.iter().map(|s| s.to_string()).collect(),
                failures: HashMap::new(),
                next_job_id: 1,
                check_files: false,
                job_limit: None,
                call_log: None,
                last_direct: None,
                last_file: None,
                last_command: None,
            }),
            form: PrintFileForm::Full,
        }
    }

    /// One idle default printer, used when no real backend is available.
    /// Its queue keeps only the most recent jobs.
    pub fn demo() -> Self {
        Self::new()
            .with_printer(json!({
                "name": "Mock Printer",
                "isDefault": true,
                "status": "IDLE",
                "description": "In-memory printer",
                "options": {"printer-make-and-model": "Mock"}
            }))
            .with_default("Mock Printer")
            .with_job_limit(DEMO_JOB_LIMIT)
    }

    pub fn with_printer(self, record: Value) -> Self {
        if let Value::Object(record) = record {
            self.lock().printers.push(record);
        }
        self
    }

    pub fn with_default(self, name: &str) -> Self {
        self.lock().default_printer = Some(name.to_string());
        self
    }

    pub fn with_driver_options(self, printer: &str, options: Value) -> Self {
        if let Value::Object(options) = options {
            self.lock().driver_options.insert(printer.to_string(), options);
        }
        self
    }

    pub fn with_job(self, printer: &str, job: Value) -> Self {
        {
            let mut state = self.lock();
            let limit = state.job_limit;
            if let Some(record) = find_printer_mut(&mut state.printers, printer) {
                push_job(record, job, limit);
            }
        }
        self
    }

    pub fn with_formats(self, formats: &[&str]) -> Self {
        self.lock().formats = formats.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_job_commands(self, commands: &[&str]) -> Self {
        self.lock().commands = commands.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_next_job_id(self, id: i64) -> Self {
        self.lock().next_job_id = id;
        self
    }

    /// Record every native call for `calls` and `call_count`.
    pub fn with_call_log(self) -> Self {
        self.lock().call_log.get_or_insert_with(Vec::new);
        self
    }

    /// Keep at most `limit` jobs per printer, dropping the oldest.
    pub fn with_job_limit(self, limit: usize) -> Self {
        self.lock().job_limit = Some(limit);
        self
    }

    /// Reject print-file requests whose path does not exist.
    pub fn with_file_check(self) -> Self {
        self.lock().check_files = true;
        self
    }

    pub fn with_print_file_form(mut self, form: PrintFileForm) -> Self {
        self.form = form;
        self
    }

    /// Make `method` fail with `message` on every call.
    pub fn failing(self, method: &str, message: &str) -> Self {
        self.lock()
            .failures
            .insert(method.to_string(), message.to_string());
        self
    }

    /// Calls seen so far; always empty without `with_call_log`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().call_log.clone().unwrap_or_default()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .call_log
            .as_ref()
            .map_or(0, |log| log.iter().filter(|c| *c == method).count())
    }

    pub fn last_direct(&self) -> Option<DirectRequest> {
        self.lock().last_direct.clone()
    }

    pub fn last_file(&self) -> Option<FileRequest> {
        self.lock().last_file.clone()
    }

    pub fn last_command(&self) -> Option<String> {
        self.lock().last_command.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, method: &str) -> NativeResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        if let Some(log) = state.call_log.as_mut() {
            log.push(method.to_string());
        }
        if let Some(message) = state.failures.get(method) {
            return Err(message.clone().into());
        }
        Ok(state)
    }
}

fn find_printer<'a>(printers: &'a [RawRecord], name: &str) -> Option<&'a RawRecord> {
    printers
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
}

fn find_printer_mut<'a>(printers: &'a mut [RawRecord], name: &str) -> Option<&'a mut RawRecord> {
    printers
        .iter_mut()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
}

fn push_job(record: &mut RawRecord, job: Value, limit: Option<usize>) {
    let jobs = record
        .entry("jobs")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(jobs) = jobs {
        jobs.push(job);
        if let Some(limit) = limit {
            let excess = jobs.len().saturating_sub(limit);
            jobs.drain(..excess);
        }
    }
}

fn job_id_of(job: &Value) -> Option<u64> {
    job.get("id").and_then(Value::as_u64)
}

fn resolve_name(state: &MockState, name: Option<&str>) -> NativeResult<String> {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => Ok(name.to_string()),
        None => state
            .default_printer
            .clone()
            .ok_or_else(|| "no default printer available".into()),
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl MockNative {
    fn queue_job(
        state: &mut MockState,
        printer: &str,
        title: &str,
        format: &str,
        size: usize,
    ) -> NativeResult<i64> {
        let id = state.next_job_id;
        let limit = state.job_limit;
        let record = find_printer_mut(&mut state.printers, printer)
            .ok_or_else(|| format!("printer not found: {}", printer))?;
        push_job(
            record,
            json!({
                "id": id,
                "name": title,
                "printerName": printer,
                "user": "mock",
                "format": format,
                "priority": 1,
                "size": size,
                "status": ["PENDING"],
                "creationTime": now_secs(),
                "processingTime": 0,
                "completedTime": 0
            }),
            limit,
        );
        state.next_job_id += 1;
        Ok(id)
    }
}

#[async_trait]
impl NativePrinting for MockNative {
    async fn get_printers(&self) -> NativeResult<Vec<RawRecord>> {
        let state = self.enter("get_printers")?;
        Ok(state.printers.clone())
    }

    async fn get_printer(&self, name: Option<&str>) -> NativeResult<RawRecord> {
        let state = self.enter("get_printer")?;
        let name = resolve_name(&state, name)?;
        find_printer(&state.printers, &name)
            .cloned()
            .ok_or_else(|| format!("printer not found: {}", name).into())
    }

    async fn get_default_printer_name(&self) -> NativeResult<Option<String>> {
        let state = self.enter("get_default_printer_name")?;
        Ok(state.default_printer.clone())
    }

    async fn get_printer_driver_options(&self, name: Option<&str>) -> NativeResult<RawRecord> {
        let state = self.enter("get_printer_driver_options")?;
        let name = resolve_name(&state, name)?;
        if find_printer(&state.printers, &name).is_none() {
            return Err(format!("printer not found: {}", name).into());
        }
        Ok(state.driver_options.get(&name).cloned().unwrap_or_default())
    }

    async fn print_direct(&self, request: DirectRequest) -> NativeResult<i64> {
        let mut state = self.enter("print_direct")?;
        let id = Self::queue_job(
            &mut state,
            &request.printer,
            &request.docname,
            &request.format,
            request.data.len(),
        )?;
        state.last_direct = Some(request);
        Ok(id)
    }

    async fn print_file(&self, request: FileRequest) -> NativeResult<i64> {
        let mut state = self.enter("print_file")?;
        if state.check_files && !std::path::Path::new(&request.filename).exists() {
            return Err(format!("file not found: {}", request.filename).into());
        }
        let printer = resolve_name(&state, request.printer.as_deref())?;
        let title = request
            .docname
            .clone()
            .unwrap_or_else(|| request.filename.clone());
        let id = Self::queue_job(&mut state, &printer, &title, "AUTO", 0)?;
        state.last_file = Some(request);
        Ok(id)
    }

    async fn get_job(&self, printer: &str, job_id: u64) -> NativeResult<RawRecord> {
        let state = self.enter("get_job")?;
        let record = find_printer(&state.printers, printer)
            .ok_or_else(|| format!("printer not found: {}", printer))?;
        record
            .get("jobs")
            .and_then(Value::as_array)
            .and_then(|jobs| jobs.iter().find(|job| job_id_of(job) == Some(job_id)))
            .and_then(|job| job.as_object().cloned())
            .ok_or_else(|| format!("job {} not found", job_id).into())
    }

    async fn set_job(&self, printer: &str, job_id: u64, command: &str) -> NativeResult<Value> {
        let mut state = self.enter("set_job")?;
        state.last_command = Some(command.to_string());

        let status = match command.to_uppercase().as_str() {
            "PAUSE" => "PAUSED",
            "RESUME" => "PENDING",
            "CANCEL" => "CANCELLED",
            other => return Err(format!("unsupported job command: {}", other).into()),
        };

        let record = find_printer_mut(&mut state.printers, printer)
            .ok_or_else(|| format!("printer not found: {}", printer))?;
        let job = record
            .get_mut("jobs")
            .and_then(Value::as_array_mut)
            .and_then(|jobs| jobs.iter_mut().find(|job| job_id_of(job) == Some(job_id)))
            .ok_or_else(|| format!("job {} not found", job_id))?;
        job["status"] = json!([status]);
        Ok(Value::Bool(true))
    }

    async fn get_supported_print_formats(&self) -> NativeResult<Vec<String>> {
        let state = self.enter("get_supported_print_formats")?;
        Ok(state.formats.clone())
    }

    async fn get_supported_job_commands(&self) -> NativeResult<Vec<String>> {
        let state = self.enter("get_supported_job_commands")?;
        Ok(state.commands.clone())
    }

    fn print_file_form(&self) -> PrintFileForm {
        self.form
    }

    fn type_name(&self) -> &'static str {
        "Mock Printing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn direct(printer: &str) -> DirectRequest {
        DirectRequest {
            data: Bytes::from_static(b"hello"),
            printer: printer.to_string(),
            docname: "greeting".to_string(),
            format: "RAW".to_string(),
            options: RawRecord::new(),
        }
    }

    #[tokio::test]
    async fn test_print_direct_queues_job() {
        let native = MockNative::demo().with_next_job_id(7);
        let id = native.print_direct(direct("Mock Printer")).await.unwrap();
        assert_eq!(id, 7);

        let job = native.get_job("Mock Printer", 7).await.unwrap();
        assert_eq!(job["name"], "greeting");
        assert_eq!(job["size"], 5);
        assert_eq!(native.last_direct().unwrap().format, "RAW");
    }

    #[tokio::test]
    async fn test_unknown_printer_message() {
        let native = MockNative::new();
        let err = native.get_printer(Some("Nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "printer not found: Nope");
    }

    #[tokio::test]
    async fn test_set_job_updates_status() {
        let native = MockNative::demo();
        let id = native.print_direct(direct("Mock Printer")).await.unwrap() as u64;
        native.set_job("Mock Printer", id, "cancel").await.unwrap();

        let job = native.get_job("Mock Printer", id).await.unwrap();
        assert_eq!(job["status"], json!(["CANCELLED"]));
        assert_eq!(native.last_command().as_deref(), Some("cancel"));

        let err = native.get_job("Mock Printer", 999).await.unwrap_err();
        assert_eq!(err.to_string(), "job 999 not found");
    }

    #[tokio::test]
    async fn test_failure_injection_and_call_log() {
        let native = MockNative::demo()
            .with_call_log()
            .failing("get_printers", "driver unavailable");
        assert!(native.get_printers().await.is_err());
        assert!(native.get_default_printer_name().await.is_ok());
        assert_eq!(native.call_count("get_printers"), 1);
        assert_eq!(native.calls(), vec!["get_printers", "get_default_printer_name"]);
    }

    #[tokio::test]
    async fn test_demo_stays_bounded() {
        let native = MockNative::demo();
        for _ in 0..DEMO_JOB_LIMIT + 10 {
            native.print_direct(direct("Mock Printer")).await.unwrap();
        }
        assert!(native.calls().is_empty());

        let printer = native.get_printer(None).await.unwrap();
        let jobs = printer["jobs"].as_array().unwrap();
        assert_eq!(jobs.len(), DEMO_JOB_LIMIT);
        assert_eq!(jobs[0]["id"], 11);
        assert!(native.get_job("Mock Printer", 1).await.is_err());
        assert!(native.get_job("Mock Printer", (DEMO_JOB_LIMIT + 10) as u64).await.is_ok());
    }

    #[tokio::test]
    async fn test_file_check() {
        let native = MockNative::demo().with_file_check();
        let err = native
            .print_file(FileRequest::filename_only("/definitely/missing.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file not found"));

        let file = tempfile::NamedTempFile::new().unwrap();
        let request = FileRequest::filename_only(file.path().to_string_lossy());
        assert!(native.print_file(request).await.is_ok());
    }
}
