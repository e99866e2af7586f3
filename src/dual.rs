//! Promise/callback bridge.
//!
//! One core operation is run once and its outcome is reported through a
//! [`Pending`] future and, when the caller passed one, a Node-style
//! [`Callback`]. The core runs eagerly on the runtime, like a promise,
//! whether or not anybody awaits the `Pending`.
//!
//! Guarantees:
//! - a panic while starting or running the core becomes an
//!   `ErrorCode::Unknown` error, never an unwinding caller;
//! - the callback runs exactly once, on its own task, after the `Pending`
//!   has been settled. A `Dual` only binds to a current-thread runtime, so
//!   that task cannot run until the caller yields.

use bytes::Bytes;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use crate::errors::{ErrorCode, PrinterError, PrinterResult};
use crate::native::RawRecord;

/// Node-style completion callback: `Ok` for `(null, result)`, `Err` for `(error)`.
pub type Callback<T> = Box<dyn FnOnce(PrinterResult<T>) + Send + 'static>;

pub fn callback<T>(f: impl FnOnce(PrinterResult<T>) + Send + 'static) -> Callback<T> {
    Box::new(f)
}

/// Object-form parameter bag.
///
/// Plain fields are JSON; binary payloads and the old `success`/`error`
/// hooks have their own slots.
#[derive(Default)]
pub struct Params {
    pub fields: RawRecord,
    pub data: Option<Bytes>,
    pub on_success: Option<Box<dyn FnOnce(Value) + Send + 'static>>,
    pub on_error: Option<Box<dyn FnOnce(PrinterError) + Send + 'static>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(PrinterError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Non-empty text field.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    fn has_hooks(&self) -> bool {
        self.on_success.is_some() || self.on_error.is_some()
    }

    /// Fold the legacy hooks into one callback, if any were given.
    pub fn take_hooks<T>(&mut self, to_value: fn(&T) -> Value) -> Option<Callback<T>>
    where
        T: Send + 'static,
    {
        if !self.has_hooks() {
            return None;
        }
        let on_success = self.on_success.take();
        let on_error = self.on_error.take();
        Some(callback(move |outcome: PrinterResult<T>| match outcome {
            Ok(value) => {
                if let Some(hook) = on_success {
                    hook(to_value(&value));
                }
            }
            Err(err) => {
                if let Some(hook) = on_error {
                    hook(err);
                }
            }
        }))
    }
}

impl From<RawRecord> for Params {
    fn from(fields: RawRecord) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }
}

/// One argument of a dynamically shaped call.
pub enum Arg<T> {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Bytes(Bytes),
    Object(Params),
    Callback(Callback<T>),
}

impl<T> Arg<T> {
    pub fn callback(f: impl FnOnce(PrinterResult<T>) + Send + 'static) -> Self {
        Arg::Callback(Box::new(f))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Arg::Object(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Null => "null",
            Arg::Bool(_) => "boolean",
            Arg::Number(_) => "number",
            Arg::Text(_) => "string",
            Arg::Bytes(_) => "buffer",
            Arg::Object(_) => "object",
            Arg::Callback(_) => "function",
        }
    }
}

impl<T> From<&str> for Arg<T> {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl<T> From<String> for Arg<T> {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl<T> From<Bytes> for Arg<T> {
    fn from(b: Bytes) -> Self {
        Arg::Bytes(b)
    }
}

impl<T> From<Vec<u8>> for Arg<T> {
    fn from(b: Vec<u8>) -> Self {
        Arg::Bytes(Bytes::from(b))
    }
}

impl<T> From<f64> for Arg<T> {
    fn from(n: f64) -> Self {
        Arg::Number(n)
    }
}

impl<T> From<bool> for Arg<T> {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}

impl<T> From<Params> for Arg<T> {
    fn from(p: Params) -> Self {
        Arg::Object(p)
    }
}

impl<T> From<RawRecord> for Arg<T> {
    fn from(fields: RawRecord) -> Self {
        Arg::Object(Params::from(fields))
    }
}

/// Remove a trailing callback from `args`.
pub fn split_callback<T>(mut args: Vec<Arg<T>>) -> (Vec<Arg<T>>, Option<Callback<T>>) {
    match args.pop() {
        Some(Arg::Callback(cb)) => (args, Some(cb)),
        Some(other) => {
            args.push(other);
            (args, None)
        }
        None => (args, None),
    }
}

/// Outcome of a wrapped call, awaitable like a promise.
#[must_use = "the result is only observable by awaiting"]
pub struct Pending<T> {
    rx: oneshot::Receiver<PrinterResult<T>>,
}

impl<T> Future for Pending<T> {
    type Output = PrinterResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(PrinterError::new(
                    ErrorCode::Unknown,
                    "operation was dropped before it completed",
                ))
            })
        })
    }
}

/// Runs core operations and reports each outcome to a `Pending` and an
/// optional callback.
#[derive(Clone)]
pub struct Dual {
    handle: Handle,
}

impl Dual {
    /// Fails for a multi-thread runtime, where a worker could run the
    /// callback while the caller is still inside its own frame.
    pub fn new(handle: Handle) -> PrinterResult<Self> {
        match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Ok(Self { handle }),
            flavor => Err(PrinterError::new(
                ErrorCode::DriverError,
                format!(
                    "the printing bridge needs a current-thread runtime, found {:?}",
                    flavor
                ),
            )),
        }
    }

    /// Bind to the runtime of the calling context.
    pub fn current() -> PrinterResult<Self> {
        let handle = Handle::try_current().map_err(|e| {
            PrinterError::with_source(
                ErrorCode::DriverError,
                "no async runtime available for the printing bridge",
                e,
            )
        })?;
        Self::new(handle)
    }

    /// Strip a trailing callback from `args`, start `core` with the rest.
    pub fn wrap<T, F, Fut>(&self, args: Vec<Arg<T>>, core: F) -> Pending<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(Vec<Arg<T>>) -> Fut,
        Fut: Future<Output = PrinterResult<T>> + Send + 'static,
    {
        let (args, callback) = split_callback(args);
        self.run(callback, move || core(args))
    }

    /// Start `core` and report its outcome to the returned `Pending` and,
    /// one task later, to `callback`.
    pub fn run<T, F, Fut>(&self, callback: Option<Callback<T>>, core: F) -> Pending<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = PrinterResult<T>> + Send + 'static,
    {
        let started = panic::catch_unwind(AssertUnwindSafe(core));
        let (tx, rx) = oneshot::channel();
        let handle = self.handle.clone();

        self.handle.spawn(async move {
            let outcome = match started {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(panicked(payload))),
                Err(payload) => Err(panicked(payload)),
            };

            match callback {
                Some(callback) => {
                    let _ = tx.send(outcome.clone());
                    handle.spawn(async move { callback(outcome) });
                }
                None => {
                    let _ = tx.send(outcome);
                }
            }
        });

        Pending { rx }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> PrinterError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    PrinterError::new(ErrorCode::Unknown, format!("operation panicked: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn dual() -> Dual {
        Dual::current().unwrap()
    }

    #[tokio::test]
    async fn test_plain_value_resolves() {
        let pending = dual().wrap(vec![Arg::from("x")], |args: Vec<Arg<usize>>| {
            let n = args.len();
            async move { Ok(n) }
        });
        assert_eq!(pending.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trailing_callback_is_not_forwarded() {
        let (tx, rx) = oneshot::channel();
        let pending = dual().wrap(
            vec![Arg::from("a"), Arg::from(2.0), Arg::callback(move |r| {
                let _ = tx.send(r);
            })],
            |args: Vec<Arg<usize>>| {
                let n = args.len();
                async move { Ok(n) }
            },
        );
        assert_eq!(pending.await.unwrap(), 2);
        assert_eq!(rx.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sync_panic_becomes_rejection() {
        let (tx, rx) = oneshot::channel();
        let pending = dual().wrap(
            vec![Arg::callback(move |r: PrinterResult<u8>| {
                let _ = tx.send(r);
            })],
            |_args| -> std::future::Ready<PrinterResult<u8>> { panic!("binding exploded") },
        );
        let err = pending.await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(err.message().contains("binding exploded"));
        assert_eq!(rx.await.unwrap().unwrap_err().code(), ErrorCode::Unknown);
    }

    #[tokio::test]
    async fn test_async_panic_becomes_rejection() {
        let pending = dual().run(None, || async {
            tokio::task::yield_now().await;
            if true {
                panic!("late failure");
            }
            Ok::<u8, PrinterError>(1)
        });
        let err = pending.await.unwrap_err();
        assert!(err.message().contains("late failure"));
    }

    #[tokio::test]
    async fn test_callback_never_fires_inline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        let (tx, rx) = oneshot::channel();

        let pending = dual().wrap(
            vec![Arg::callback(move |_r: PrinterResult<u8>| {
                seen.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            })],
            |_args| std::future::ready(Ok(5)),
        );
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert_eq!(pending.await.unwrap(), 5);
        rx.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_outcome_reported_once_per_path() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        let pending = dual().wrap(
            vec![Arg::callback(move |r: PrinterResult<u8>| {
                sink.lock().unwrap().push(r.map_err(|e| e.code()));
            })],
            |_args| async {
                Err(PrinterError::new(ErrorCode::JobNotFound, "job 1 not found"))
            },
        );

        assert_eq!(pending.await.unwrap_err().code(), ErrorCode::JobNotFound);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*reports.lock().unwrap(), vec![Err(ErrorCode::JobNotFound)]);
    }

    #[tokio::test]
    async fn test_runs_without_being_awaited() {
        let (tx, rx) = oneshot::channel();
        let pending = dual().run(
            Some(callback(move |r: PrinterResult<u8>| {
                let _ = tx.send(r);
            })),
            || async { Ok(9) },
        );
        drop(pending);
        assert_eq!(rx.await.unwrap().unwrap(), 9);
    }

    #[test]
    fn test_current_without_runtime() {
        let err = Dual::current().err().unwrap();
        assert_eq!(err.code(), ErrorCode::DriverError);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_multi_thread_runtime_rejected() {
        let err = Dual::current().err().unwrap();
        assert_eq!(err.code(), ErrorCode::DriverError);
        assert!(err.message().contains("current-thread"));
    }

    #[test]
    fn test_new_with_current_thread_handle() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let dual = Dual::new(runtime.handle().clone()).unwrap();
        let pending = runtime.block_on(async { dual.run(None, || async { Ok(3u8) }) });
        assert_eq!(runtime.block_on(pending).unwrap(), 3);
    }

    #[test]
    fn test_split_callback() {
        let (args, cb) = split_callback::<u8>(vec![Arg::Null, Arg::from("a")]);
        assert_eq!(args.len(), 2);
        assert!(cb.is_none());

        let (args, cb) = split_callback::<u8>(vec![Arg::callback(|_| {})]);
        assert!(args.is_empty());
        assert!(cb.is_some());
    }

    #[tokio::test]
    async fn test_param_hooks() {
        let (tx, rx) = oneshot::channel();
        let mut params = Params::new().on_success(move |v| {
            let _ = tx.send(v);
        });
        let cb = params.take_hooks::<i64>(|id| Value::from(*id)).unwrap();
        cb(Ok(12));
        assert_eq!(rx.await.unwrap(), Value::from(12));
        assert!(params.take_hooks::<i64>(|id| Value::from(*id)).is_none());
    }
}
