use std::sync::Arc;
use tracing::info;

use crate::config::{ConfigError, PrintingConfig};
use crate::errors::PrinterResult;
use crate::jobs::Jobs;
use crate::legacy::Legacy;
use crate::native::{connect, NativePrinting};
use crate::printers::Printers;

/// Both modern facades over one native collaborator.
#[derive(Clone)]
pub struct Printing {
    pub printers: Printers,
    pub jobs: Jobs,
    native: Arc<dyn NativePrinting>,
    config: PrintingConfig,
}

impl Printing {
    pub fn new(native: Arc<dyn NativePrinting>) -> Self {
        Self::with_config(native, PrintingConfig::default())
    }

    pub fn with_config(native: Arc<dyn NativePrinting>, config: PrintingConfig) -> Self {
        Self {
            printers: Printers::new(native.clone()),
            jobs: Jobs::with_config(native.clone(), &config),
            native,
            config,
        }
    }

    /// Build the backend `config` selects.
    pub fn from_config(config: PrintingConfig) -> Self {
        let native = connect(&config);
        Self::with_config(native, config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config = PrintingConfig::from_env()?;
        info!("Printing configured from environment: {:?}", config);
        Ok(Self::from_config(config))
    }

    /// Deprecated callback/promise surface sharing this collaborator.
    /// Must be called from within a current-thread tokio runtime.
    pub fn legacy(&self) -> PrinterResult<Legacy> {
        Legacy::new(self.native.clone(), self.config.clone())
    }

    pub fn native(&self) -> &Arc<dyn NativePrinting> {
        &self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::dual::Arg;
    use crate::native::MockNative;
    use crate::types::{PrintFileOptions, PrinterState};
    use serde_json::json;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_facades_share_collaborator() {
        init_tracing();
        let native = Arc::new(
            MockNative::new()
                .with_call_log()
                .with_printer(json!({"name": "HP", "isDefault": true, "status": ["OFFLINE"]}))
                .with_next_job_id(7),
        );
        let printing = Printing::new(native.clone());

        let printers = printing.printers.list().await.unwrap();
        assert_eq!(printers[0].state, PrinterState::Offline);

        let result = printing
            .jobs
            .print_file(PrintFileOptions {
                printer: "HP".to_string(),
                file: "doc.txt".to_string(),
                options: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(result.id, 7);

        let legacy = printing.legacy().unwrap();
        let details = legacy.get_printer(vec![Arg::from("HP")]).await.unwrap();
        assert_eq!(details.jobs.map(|jobs| jobs.len()), Some(1));
        assert_eq!(native.call_count("print_file"), 1);
    }

    #[tokio::test]
    async fn test_from_config_mock_backend() {
        init_tracing();
        let printing = Printing::from_config(PrintingConfig {
            backend: Backend::Mock,
            default_docname: "receipt".to_string(),
            ..PrintingConfig::default()
        });
        assert_eq!(printing.native().type_name(), "Mock Printing");

        let printer = printing.printers.default_printer().await.unwrap();
        assert_eq!(printer.name, "Mock Printer");
    }
}
