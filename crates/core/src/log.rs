//! # Log Sink Port
//!
//! Every endpoint receives an `Arc<dyn LogSink>` at construction and writes its
//! operational and packet records through it.
//!
//! A sink owns the mutual exclusion around its output: one record is written
//! while the sink's lock is held, so records from concurrent connections never
//! interleave.

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for leveled, tagged log records
pub trait LogSink: Send + Sync {
    /// Write one complete record
    ///
    /// Must never panic or fail; logging is best-effort.
    fn write(&self, level: LogLevel, tag: &str, message: &str);
}

/// Sink forwarding records to `tracing`
#[derive(Default)]
pub struct TracingSink {
    lock: Mutex<()>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, tag: &str, message: &str) {
        let _guard = self.lock.lock();
        match level {
            LogLevel::Debug => tracing::debug!(tag = %tag, "{}", message),
            LogLevel::Info => tracing::info!(tag = %tag, "{}", message),
            LogLevel::Error => tracing::error!(tag = %tag, "{}", message),
        }
    }
}

/// Sink writing plain text records to any writer (stdout, a file, a buffer)
///
/// # Format
/// ```text
/// [LEVEL][tag] first line of the message
/// remaining lines verbatim
/// ```
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink printing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write(&self, level: LogLevel, tag: &str, message: &str) {
        let mut writer = self.writer.lock();
        let mut lines = message.lines();
        let first = lines.next().unwrap_or("");
        let _ = writeln!(writer, "[{}][{}] {}", level, tag, first);
        for line in lines {
            let _ = writeln!(writer, "{}", line);
        }
        let _ = writer.flush();
    }
}

/// A record captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

/// Sink keeping every record in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records written so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records with the given tag
    pub fn with_tag(&self, tag: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.tag == tag)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: LogLevel, tag: &str, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            tag: tag.to_string(),
            message: message.to_string(),
        });
    }
}
