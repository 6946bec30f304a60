//! Fire-and-forget event logging.
//!
//! The worker reports what it does through an [`EventLog`]: a thin facade over
//! one or more [`EventSink`]s. A sink may fail (disk full, file removed);
//! the facade turns that into a `tracing` error and carries on, so a broken
//! event log never stops a background task.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination for event log entries.
pub trait EventSink: Send + Sync {
    fn write(&self, severity: Severity, message: &str) -> Result<()>;
}

/// Forwards entries to `tracing`, tagged with the event source.
#[derive(Debug, Clone)]
pub struct TracingSink {
    source: String,
}

impl TracingSink {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl EventSink for TracingSink {
    fn write(&self, severity: Severity, message: &str) -> Result<()> {
        match severity {
            Severity::Info => tracing::info!(source = %self.source, "{}", message),
            Severity::Warning => tracing::warn!(source = %self.source, "{}", message),
            Severity::Error => tracing::error!(source = %self.source, "{}", message),
        }
        Ok(())
    }
}

/// Appends timestamped lines to a file.
///
/// Line format: `2026-01-31T12:00:00.000+00:00 [INFO] test-log: message`.
pub struct FileSink {
    path: PathBuf,
    source: String,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>, source: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::EventLog(format!("Failed to open '{}': {}", path.display(), e))
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            source: source.into(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn write(&self, severity: Severity, message: &str) -> Result<()> {
        let line = format!(
            "{} [{}] {}: {}\n",
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
            severity,
            self.source,
            message
        );
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::EventLog(format!("Failed to write '{}': {}", self.path.display(), e)))
    }
}

/// Cloneable handle over a set of sinks.
#[derive(Clone)]
pub struct EventLog {
    sinks: Arc<Vec<Box<dyn EventSink>>>,
}

impl EventLog {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(sinks),
        }
    }

    /// Event log that only forwards to `tracing`.
    pub fn tracing(source: impl Into<String>) -> Self {
        Self::new(vec![Box::new(TracingSink::new(source))])
    }

    /// Write to every sink, returning the first failure.
    ///
    /// Every sink is attempted even when an earlier one fails.
    pub fn try_write(&self, severity: Severity, message: &str) -> Result<()> {
        let mut first_err = None;
        for sink in self.sinks.iter() {
            if let Err(e) = sink.write(severity, message) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn write(&self, severity: Severity, message: &str) {
        if let Err(e) = self.try_write(severity, message) {
            tracing::error!("Event log write failed: {}", e);
        }
    }

    pub fn write_info(&self, message: &str) {
        self.write(Severity::Info, message);
    }

    pub fn write_warning(&self, message: &str) {
        self.write(Severity::Warning, message);
    }

    pub fn write_error(&self, message: &str) {
        self.write(Severity::Error, message);
    }

    pub fn write_service_started(&self, service: &str) {
        self.write_info(&format!("Service '{}' started", service));
    }

    pub fn write_service_stopped(&self, service: &str) {
        self.write_info(&format!("Service '{}' stopped", service));
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// In-memory sink for tests.
///
/// Records every entry so assertions can inspect what was written, and can be
/// switched into a failing mode to exercise write errors. Not meant for
/// production use; it grows without bound.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, String)>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().clone()
    }

    /// Count of entries whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, m)| m.contains(needle))
            .count()
    }

    /// While set, every write fails.
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

impl EventSink for Arc<MemorySink> {
    fn write(&self, severity: Severity, message: &str) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::EventLog("sink unavailable".to_string()));
        }
        self.entries.lock().push((severity, message.to_string()));
        Ok(())
    }
}
