// Native collaborator boundary
//
// The OS printing subsystem (Winspool or CUPS) is reached only through
// `NativePrinting`. Facades receive it as an explicit `Arc<dyn NativePrinting>`.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::{Backend, PrintingConfig};
use crate::errors::NativeError;

mod mock;
#[cfg(feature = "system-printers")]
mod system;

pub use mock::MockNative;
#[cfg(feature = "system-printers")]
pub use system::SystemNative;

/// Printer, job or option record exactly as the native layer reported it.
pub type RawRecord = Map<String, Value>;

pub type NativeResult<T> = Result<T, NativeError>;

/// Shape of the collaborator's print-file entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFileForm {
    /// Takes only a filename and prints to the default queue.
    FilenameOnly,
    /// Takes filename, document name, printer and options.
    Full,
}

#[derive(Debug, Clone)]
pub struct DirectRequest {
    pub data: Bytes,
    pub printer: String,
    pub docname: String,
    /// Document type, e.g. `RAW`, `TEXT`, `PDF`.
    pub format: String,
    pub options: RawRecord,
}

#[derive(Debug, Clone, Default)]
pub struct FileRequest {
    pub filename: String,
    pub docname: Option<String>,
    pub printer: Option<String>,
    pub options: RawRecord,
}

impl FileRequest {
    pub fn filename_only(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }
}

/// Fixed native surface. Implementations may complete immediately
/// (synchronous bindings) or suspend.
#[async_trait]
pub trait NativePrinting: Send + Sync {
    async fn get_printers(&self) -> NativeResult<Vec<RawRecord>>;

    /// `None` asks for the default printer.
    async fn get_printer(&self, name: Option<&str>) -> NativeResult<RawRecord>;

    async fn get_default_printer_name(&self) -> NativeResult<Option<String>>;

    async fn get_printer_driver_options(&self, name: Option<&str>) -> NativeResult<RawRecord>;

    async fn print_direct(&self, request: DirectRequest) -> NativeResult<i64>;

    async fn print_file(&self, request: FileRequest) -> NativeResult<i64>;

    async fn get_job(&self, printer: &str, job_id: u64) -> NativeResult<RawRecord>;

    async fn set_job(&self, printer: &str, job_id: u64, command: &str) -> NativeResult<Value>;

    async fn get_supported_print_formats(&self) -> NativeResult<Vec<String>>;

    async fn get_supported_job_commands(&self) -> NativeResult<Vec<String>>;

    /// Jobs queued on one printer. Defaults to the `jobs` array of the
    /// printer record.
    async fn get_jobs(&self, printer: &str) -> NativeResult<Vec<RawRecord>> {
        let record = self.get_printer(Some(printer)).await?;
        Ok(match record.get("jobs") {
            Some(Value::Array(jobs)) => jobs
                .iter()
                .filter_map(|job| job.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        })
    }

    fn print_file_form(&self) -> PrintFileForm {
        PrintFileForm::Full
    }

    fn type_name(&self) -> &'static str;
}

/// Build the collaborator selected by `config`.
///
/// A system backend that is not compiled in falls back to the in-memory
/// mock so callers always get a working handle.
pub fn connect(config: &PrintingConfig) -> Arc<dyn NativePrinting> {
    info!("Initializing native printing backend: {:?}", config.backend);

    let native: Arc<dyn NativePrinting> = match config.backend {
        Backend::Mock => Arc::new(MockNative::demo()),
        Backend::System => system_backend(),
    };

    info!("Using native backend: {}", native.type_name());
    native
}

#[cfg(feature = "system-printers")]
fn system_backend() -> Arc<dyn NativePrinting> {
    Arc::new(SystemNative::new())
}

#[cfg(not(feature = "system-printers"))]
fn system_backend() -> Arc<dyn NativePrinting> {
    tracing::warn!("System printing support not compiled in, using mock backend");
    Arc::new(MockNative::demo())
}
