//! Observer hooks for read and write outcomes.
//!
//! Attach an observer through [`crate::options::ReadOptions::observer`] or
//! [`crate::options::WriteOptions::observer`]. Failures at or above the options'
//! `alert_at_or_above` severity go to [`CsvyObserver::on_alert`] instead of
//! [`CsvyObserver::on_failure`].

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engines::{Container, Tabular};
use crate::error::{CsvyError, CsvyResult};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CsvySeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (I/O failures).
    Critical,
}

/// Direction of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Context about a read or write attempt.
#[derive(Debug, Clone)]
pub struct CsvyContext {
    /// The file path, `None` for in-memory readers and writers.
    pub path: Option<PathBuf>,
    pub operation: Operation,
    /// The container the payload was read into or written from.
    pub container: Container,
}

impl CsvyContext {
    fn path_display(&self) -> String {
        self.path
            .as_deref()
            .map_or_else(|| "<stream>".to_string(), |p| p.display().to_string())
    }
}

/// Stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvyStats {
    /// Payload rows, when known without materializing.
    pub rows: Option<usize>,
    /// Lines taken by the header block (0 without one).
    pub header_lines: usize,
}

/// Observer interface for read and write outcomes.
pub trait CsvyObserver: Send + Sync {
    /// Called when the operation succeeds.
    fn on_success(&self, _ctx: &CsvyContext, _stats: CsvyStats) {}

    /// Called when the operation fails.
    fn on_failure(&self, _ctx: &CsvyContext, _severity: CsvySeverity, _error: &CsvyError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn CsvyObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn CsvyObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl CsvyObserver for CompositeObserver {
    fn on_success(&self, ctx: &CsvyContext, stats: CsvyStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl CsvyObserver for StdErrObserver {
    fn on_success(&self, ctx: &CsvyContext, stats: CsvyStats) {
        eprintln!(
            "[csvy][{:?}][ok] container={:?} path={} header_lines={} rows={:?}",
            ctx.operation,
            ctx.container,
            ctx.path_display(),
            stats.header_lines,
            stats.rows
        );
    }

    fn on_failure(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        eprintln!(
            "[csvy][{:?}][{:?}] container={:?} path={} err={}",
            ctx.operation,
            severity,
            ctx.container,
            ctx.path_display(),
            error
        );
    }

    fn on_alert(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        eprintln!(
            "[ALERT][csvy][{:?}][{:?}] container={:?} path={} err={}",
            ctx.operation,
            severity,
            ctx.container,
            ctx.path_display(),
            error
        );
    }
}

/// Appends events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl CsvyObserver for FileObserver {
    fn on_success(&self, ctx: &CsvyContext, stats: CsvyStats) {
        self.append_line(&format!(
            "{} ok op={:?} container={:?} path={} header_lines={} rows={:?}",
            unix_ts(),
            ctx.operation,
            ctx.container,
            ctx.path_display(),
            stats.header_lines,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        self.append_line(&format!(
            "{} fail severity={:?} op={:?} container={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.operation,
            ctx.container,
            ctx.path_display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &CsvyContext, severity: CsvySeverity, error: &CsvyError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} op={:?} container={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.operation,
            ctx.container,
            ctx.path_display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Severity of a failure: I/O problems are critical, everything else is an error.
pub(crate) fn severity_for_error(error: &CsvyError) -> CsvySeverity {
    match error {
        CsvyError::Io(_) => CsvySeverity::Critical,
        CsvyError::Csv(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => CsvySeverity::Critical,
        _ => CsvySeverity::Error,
    }
}

/// Report `result`, a value paired with its header line count, to `observer` (if any) and hand
/// it back unchanged.
pub(crate) fn observe<T: Tabular>(
    observer: Option<&Arc<dyn CsvyObserver>>,
    threshold: CsvySeverity,
    ctx: impl FnOnce() -> CsvyContext,
    result: CsvyResult<(T, usize)>,
) -> CsvyResult<(T, usize)> {
    let Some(observer) = observer else {
        return result;
    };
    let ctx = ctx();
    match &result {
        Ok((value, header_lines)) => observer.on_success(
            &ctx,
            CsvyStats {
                rows: value.row_count(),
                header_lines: *header_lines,
            },
        ),
        Err(e) => {
            let severity = severity_for_error(e);
            if severity >= threshold {
                observer.on_alert(&ctx, severity, e);
            } else {
                observer.on_failure(&ctx, severity, e);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl CsvyObserver for Recorder {
        fn on_success(&self, _ctx: &CsvyContext, stats: CsvyStats) {
            self.events.lock().unwrap().push(format!("ok:{:?}", stats.rows));
        }

        fn on_failure(&self, _ctx: &CsvyContext, severity: CsvySeverity, _error: &CsvyError) {
            self.events.lock().unwrap().push(format!("fail:{severity:?}"));
        }

        fn on_alert(&self, _ctx: &CsvyContext, severity: CsvySeverity, _error: &CsvyError) {
            self.events.lock().unwrap().push(format!("alert:{severity:?}"));
        }
    }

    fn ctx() -> CsvyContext {
        CsvyContext {
            path: None,
            operation: Operation::Read,
            container: Container::Rows,
        }
    }

    #[test]
    fn io_errors_are_critical() {
        let io = CsvyError::Io(std::io::Error::other("boom"));
        assert_eq!(severity_for_error(&io), CsvySeverity::Critical);
        let shape = CsvyError::SchemaMismatch {
            message: "x".to_string(),
        };
        assert_eq!(severity_for_error(&shape), CsvySeverity::Error);
    }

    #[test]
    fn observe_routes_by_threshold() {
        let rec = Arc::new(Recorder::default());
        let observer: Arc<dyn CsvyObserver> = rec.clone();

        let ok: CsvyResult<(Vec<Vec<String>>, usize)> = Ok((vec![vec!["a".to_string()]], 2));
        observe(Some(&observer), CsvySeverity::Critical, ctx, ok).unwrap();

        let err: CsvyResult<(Vec<Vec<String>>, usize)> = Err(CsvyError::SchemaMismatch {
            message: "x".to_string(),
        });
        let _ = observe(Some(&observer), CsvySeverity::Critical, ctx, err);

        let err: CsvyResult<(Vec<Vec<String>>, usize)> =
            Err(CsvyError::Io(std::io::Error::other("boom")));
        let _ = observe(Some(&observer), CsvySeverity::Critical, ctx, err);

        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["ok:Some(1)", "fail:Error", "alert:Critical"]
        );
    }

    #[test]
    fn composite_fans_out() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let observers: Vec<Arc<dyn CsvyObserver>> = vec![a.clone(), b.clone()];
        let composite = CompositeObserver::new(observers);
        composite.on_success(
            &ctx(),
            CsvyStats {
                rows: None,
                header_lines: 3,
            },
        );
        assert_eq!(a.events.lock().unwrap().len(), 1);
        assert_eq!(b.events.lock().unwrap().len(), 1);
    }
}
