//! Cross-platform printing behind one normalized interface.
//!
//! The OS printing subsystem is reached through [`NativePrinting`]. Its raw,
//! platform-shaped records are normalized into [`Printer`] and [`PrintJob`],
//! and every failure into a [`PrinterError`] with a stable [`ErrorCode`].
//!
//! Modern callers use [`Printers`] and [`Jobs`] (bundled as [`Printing`]).
//! The deprecated four-function surface lives in [`Legacy`] and accepts
//! both callbacks and awaiting through the [`dual`] bridge.

// Library module organization
pub mod client;
pub mod config;
pub mod dual;
pub mod errors;
pub mod jobs;
pub mod legacy;
pub mod native;
pub mod normalize;
pub mod printers;
pub mod types;

// Re-export commonly used types for convenience
pub use client::Printing;
pub use config::{Backend, ConfigError, PrintingConfig};
pub use dual::{Arg, Callback, Dual, Params, Pending};
pub use errors::{ErrorCode, NativeError, PrinterError, PrinterResult};
pub use jobs::Jobs;
pub use legacy::Legacy;
pub use native::{connect, MockNative, NativePrinting, RawRecord};
pub use printers::Printers;
pub use types::{
    JobCommand, JobDetails, JobState, Orientation, PrintFileOptions, PrintFormat, PrintJob,
    PrintJobResult, PrintOptions, PrintRawOptions, Printer, PrinterCapabilities, PrinterDetails,
    PrinterState,
};

#[cfg(feature = "system-printers")]
pub use native::SystemNative;
