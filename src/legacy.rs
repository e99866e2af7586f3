// Deprecated four-function surface
//
// Each entry point accepts the old call shapes: a single parameter object,
// or positional arguments, optionally followed by a callback. The shape is
// classified once into a typed call, then one async path runs through `Dual`.

use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PrintingConfig;
use crate::dual::{split_callback, Arg, Callback, Dual, Params, Pending};
use crate::errors::{PrinterError, PrinterResult};
use crate::native::{DirectRequest, FileRequest, NativePrinting, PrintFileForm, RawRecord};
use crate::normalize::{legacy_printer, truthy};
use crate::types::PrinterDetails;

pub struct Legacy {
    native: Arc<dyn NativePrinting>,
    config: PrintingConfig,
    dual: Dual,
}

impl Legacy {
    /// Bind to the runtime of the calling context.
    pub fn new(native: Arc<dyn NativePrinting>, config: PrintingConfig) -> PrinterResult<Self> {
        Ok(Self::with_dual(native, config, Dual::current()?))
    }

    pub fn with_dual(native: Arc<dyn NativePrinting>, config: PrintingConfig, dual: Dual) -> Self {
        Self {
            native,
            config,
            dual,
        }
    }

    /// `getPrinters([callback])`
    pub fn get_printers(&self, args: Vec<Arg<Vec<PrinterDetails>>>) -> Pending<Vec<PrinterDetails>> {
        let native = self.native.clone();
        self.dual.wrap(args, move |_args| list_printers(native))
    }

    /// `getPrinter([name], [callback])`; no name means the default printer.
    pub fn get_printer(&self, args: Vec<Arg<PrinterDetails>>) -> Pending<PrinterDetails> {
        let native = self.native.clone();
        self.dual
            .wrap(args, move |args| find_printer(native, text_arg(args.first())))
    }

    /// `printDirect({data, printer, docname, type, options, success, error}, [callback])`
    /// or `printDirect(data, printer, type, docname, options, [callback])`.
    ///
    /// Resolves to the native job id.
    pub fn print_direct(&self, args: Vec<Arg<i64>>) -> Pending<i64> {
        let (args, callback) = split_callback(args);
        let (call, hooks) = DirectCall::parse(args, &self.config);
        let native = self.native.clone();

        self.dual
            .run(callback.or(hooks), move || print_direct(native, call))
    }

    /// `printFile({filename, docname, printer, options, success, error}, [callback])`
    /// or `printFile(filename, docname, printer, options, [callback])`.
    ///
    /// Without a printer, a filename-only collaborator is called with just
    /// the filename; otherwise the default printer is resolved.
    pub fn print_file(&self, args: Vec<Arg<i64>>) -> Pending<i64> {
        let (args, callback) = split_callback(args);
        let (call, hooks) = FileCall::parse(args);
        let native = self.native.clone();

        self.dual
            .run(callback.or(hooks), move || print_file(native, call))
    }
}

async fn list_printers(native: Arc<dyn NativePrinting>) -> PrinterResult<Vec<PrinterDetails>> {
    let raw = native
        .get_printers()
        .await
        .map_err(PrinterError::from_native)?;
    Ok(raw.into_iter().map(legacy_printer).collect())
}

async fn find_printer(
    native: Arc<dyn NativePrinting>,
    name: Option<String>,
) -> PrinterResult<PrinterDetails> {
    let name = match name {
        Some(name) => name,
        None => resolve_default(native.as_ref()).await?,
    };
    let raw = native
        .get_printer(Some(&name))
        .await
        .map_err(PrinterError::from_native)?;
    Ok(legacy_printer(raw))
}

async fn print_direct(
    native: Arc<dyn NativePrinting>,
    call: PrinterResult<DirectCall>,
) -> PrinterResult<i64> {
    let call = call?;
    let printer = match call.printer {
        Some(printer) => printer,
        None => resolve_default(native.as_ref()).await?,
    };

    let request = DirectRequest {
        data: call.data,
        printer,
        docname: call.docname,
        format: call.format,
        options: call.options,
    };
    debug!("Legacy printDirect to {} as {}", request.printer, request.format);

    let id = native
        .print_direct(request)
        .await
        .map_err(PrinterError::from_native)?;
    info!("Legacy printDirect queued job {}", id);
    Ok(id)
}

async fn print_file(
    native: Arc<dyn NativePrinting>,
    call: PrinterResult<FileCall>,
) -> PrinterResult<i64> {
    let call = call?;

    let printer = match call.printer {
        Some(printer) => printer,
        None if native.print_file_form() == PrintFileForm::FilenameOnly => {
            debug!("Legacy printFile of {} to the native default", call.filename);
            return native
                .print_file(FileRequest::filename_only(call.filename))
                .await
                .map_err(PrinterError::from_native);
        }
        None => resolve_default(native.as_ref()).await?,
    };

    let docname = call.docname.unwrap_or_else(|| call.filename.clone());
    let id = native
        .print_file(FileRequest {
            filename: call.filename,
            docname: Some(docname),
            printer: Some(printer),
            options: call.options,
        })
        .await
        .map_err(PrinterError::from_native)?;
    info!("Legacy printFile queued job {}", id);
    Ok(id)
}

struct DirectCall {
    data: Bytes,
    printer: Option<String>,
    docname: String,
    format: String,
    options: RawRecord,
}

impl DirectCall {
    fn parse(
        args: Vec<Arg<i64>>,
        config: &PrintingConfig,
    ) -> (PrinterResult<DirectCall>, Option<Callback<i64>>) {
        let mut hooks = None;

        let (data, printer, format, docname, options) = if is_object_form(&args) {
            let mut params = into_params(args);
            hooks = params.take_hooks(job_id_value);
            let data = params
                .data
                .take()
                .or_else(|| params.text("data").map(Bytes::from))
                .ok_or_else(|| "must provide data to print".to_string());
            (
                data,
                params.text("printer"),
                params.text("type"),
                params.text("docname"),
                object_field(&params, "options"),
            )
        } else {
            let mut args = args.into_iter();
            let data = match args.next() {
                Some(Arg::Bytes(data)) => Ok(data),
                Some(Arg::Text(text)) => Ok(Bytes::from(text)),
                Some(other) => Err(format!(
                    "must provide data to print, got {}",
                    other.kind()
                )),
                None => Err("must provide data to print".to_string()),
            };
            let printer = text_arg(args.next().as_ref());
            let format = text_arg(args.next().as_ref());
            let docname = text_arg(args.next().as_ref());
            let options = match args.next() {
                Some(Arg::Object(params)) => params.fields,
                _ => RawRecord::new(),
            };
            (data, printer, format, docname, options)
        };

        let call = data
            .map_err(PrinterError::invalid_arguments)
            .map(|data| DirectCall {
                data,
                printer,
                docname: docname.unwrap_or_else(|| config.default_docname.clone()),
                format: format
                    .unwrap_or_else(|| config.default_format.clone())
                    .to_uppercase(),
                options,
            });
        (call, hooks)
    }
}

struct FileCall {
    filename: String,
    docname: Option<String>,
    printer: Option<String>,
    options: RawRecord,
}

impl FileCall {
    fn parse(args: Vec<Arg<i64>>) -> (PrinterResult<FileCall>, Option<Callback<i64>>) {
        let mut hooks = None;

        let (filename, docname, printer, options) = if is_object_form(&args) {
            let mut params = into_params(args);
            hooks = params.take_hooks(job_id_value);
            (
                params.text("filename"),
                params.text("docname"),
                params.text("printer"),
                object_field(&params, "options"),
            )
        } else {
            let mut args = args.into_iter();
            let filename = text_arg(args.next().as_ref());
            let docname = text_arg(args.next().as_ref());
            let printer = text_arg(args.next().as_ref());
            let options = match args.next() {
                Some(Arg::Object(params)) => params.fields,
                _ => RawRecord::new(),
            };
            (filename, docname, printer, options)
        };

        let call = filename
            .ok_or_else(|| PrinterError::invalid_arguments("must provide at least a filename"))
            .map(|filename| FileCall {
                filename,
                docname,
                printer,
                options,
            });
        (call, hooks)
    }
}

/// A lone parameter object selects the object form.
fn is_object_form<T>(args: &[Arg<T>]) -> bool {
    args.len() == 1 && args[0].is_object()
}

fn into_params<T>(args: Vec<Arg<T>>) -> Params {
    match args.into_iter().next() {
        Some(Arg::Object(params)) => params,
        _ => Params::new(),
    }
}

fn text_arg<T>(arg: Option<&Arg<T>>) -> Option<String> {
    match arg {
        Some(Arg::Text(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn object_field(params: &Params, key: &str) -> RawRecord {
    match params.fields.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => RawRecord::new(),
    }
}

fn job_id_value(id: &i64) -> Value {
    Value::from(*id)
}

/// Default printer name, falling back to the printer flagged as default.
async fn resolve_default(native: &dyn NativePrinting) -> PrinterResult<String> {
    match native.get_default_printer_name().await {
        Ok(Some(name)) if !name.is_empty() => return Ok(name),
        Ok(_) => {}
        Err(e) => debug!("Default printer name unavailable: {}", e),
    }

    let printers = native
        .get_printers()
        .await
        .map_err(PrinterError::from_native)?;
    printers
        .iter()
        .find(|p| p.get("isDefault").map(truthy).unwrap_or(false))
        .and_then(|p| p.get("name").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            PrinterError::printer_not_found("No printer specified and no default printer available")
        })
}
