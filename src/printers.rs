use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{ErrorCode, PrinterError, PrinterResult};
use crate::native::{NativePrinting, RawRecord};
use crate::normalize::{
    merge_capability_record, normalize_capabilities, normalize_printer, selected_paper_size,
};
use crate::types::{Printer, PrinterCapabilities};

/// Printer discovery and capability lookup.
#[derive(Clone)]
pub struct Printers {
    native: Arc<dyn NativePrinting>,
}

impl Printers {
    pub fn new(native: Arc<dyn NativePrinting>) -> Self {
        Self { native }
    }

    /// All printers the system knows about.
    ///
    /// Entries without a name, and repeats of a name already listed, are
    /// skipped.
    pub async fn list(&self) -> PrinterResult<Vec<Printer>> {
        let raw = self.native.get_printers().await.map_err(|e| {
            PrinterError::from_native(e).or_code(ErrorCode::DriverError)
        })?;

        let mut seen = HashSet::new();
        let mut printers = Vec::with_capacity(raw.len());
        for record in &raw {
            let printer = normalize_printer(record);
            if printer.name.is_empty() {
                warn!("Skipping printer record without a name");
                continue;
            }
            if !seen.insert(printer.name.clone()) {
                warn!("Skipping duplicate printer: {}", printer.name);
                continue;
            }
            printers.push(printer);
        }

        debug!("Listed {} printers", printers.len());
        Ok(printers)
    }

    /// The system default printer, with capabilities when available.
    pub async fn default_printer(&self) -> PrinterResult<Printer> {
        let name = self
            .native
            .get_default_printer_name()
            .await
            .map_err(PrinterError::from_native)?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PrinterError::printer_not_found("No default printer found"))?;

        self.get(&name).await
    }

    /// One printer by name. Capabilities are attached on a best-effort basis.
    pub async fn get(&self, name: &str) -> PrinterResult<Printer> {
        require_name(name)?;

        let raw = self
            .native
            .get_printer(Some(name))
            .await
            .map_err(PrinterError::from_native)?;
        let mut printer = normalize_printer(&raw);

        match self.capabilities(name).await {
            Ok(capabilities) => printer.capabilities = Some(capabilities),
            Err(e) => warn!("Capabilities unavailable for {}: {}", name, e),
        }

        Ok(printer)
    }

    /// Supported formats merged with the printer's driver options.
    ///
    /// The format list is required; driver options are not, and a failed
    /// lookup counts as an empty set.
    pub async fn capabilities(&self, name: &str) -> PrinterResult<PrinterCapabilities> {
        require_name(name)?;

        let formats = self
            .native
            .get_supported_print_formats()
            .await
            .map_err(PrinterError::from_native)?;

        let driver_options = match self.native.get_printer_driver_options(Some(name)).await {
            Ok(options) => options,
            Err(e) => {
                warn!("Driver options unavailable for {}: {}", name, e);
                RawRecord::new()
            }
        };

        let merged = merge_capability_record(&formats, driver_options);
        Ok(normalize_capabilities(&merged))
    }

    /// Raw driver options as the native layer reports them. Shape varies
    /// by platform and driver.
    pub async fn driver_options(&self, name: &str) -> PrinterResult<RawRecord> {
        require_name(name)?;

        self.native
            .get_printer_driver_options(Some(name))
            .await
            .map_err(PrinterError::from_native)
    }

    /// Currently selected paper size, or an empty string.
    pub async fn selected_paper_size(&self, name: &str) -> PrinterResult<String> {
        let options = self.driver_options(name).await?;
        Ok(selected_paper_size(&options))
    }
}

fn require_name(name: &str) -> PrinterResult<()> {
    if name.trim().is_empty() {
        return Err(PrinterError::invalid_arguments("Printer name is required"));
    }
    Ok(())
}
