//! # Logger Service
//!
//! Backends for the `log` facade used throughout the workspace.
//!
//! - [`ConsoleLogger`] writes `[LEVEL target] message` lines to stderr.
//! - [`RecordingLogger`] keeps structured [`LogEntry`] values in memory so
//!   tests can assert on what the scheduler reported.
//!
//! Messages that mention a task as `[pid]` get that pid as their source.

use core_types::Pid;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::{Mutex, Once};
use std::io::Write;
use std::sync::Arc;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Task the message is about, if it names one
    pub source: Option<Pid>,
    pub message: String,
    /// Structured fields; every captured record carries `target`
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String) -> Self {
        Self {
            level,
            source: None,
            message,
            fields: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Pid) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_field(mut self, key: String, value: String) -> Self {
        self.fields.push((key, value));
        self
    }

    /// Value of the first field named `key`
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Builds an entry from a `log` record
    pub fn from_record(record: &Record<'_>) -> Self {
        let message = record.args().to_string();
        let mut entry = Self::new(record.level().into(), message)
            .with_field("target".to_string(), record.target().to_string());
        if let Some(module) = record.module_path() {
            entry = entry.with_field("module".to_string(), module.to_string());
        }
        if let Some(pid) = mentioned_pid(&entry.message) {
            entry = entry.with_source(pid);
        }
        entry
    }
}

/// First `[digits]` group of a message
fn mentioned_pid(message: &str) -> Option<Pid> {
    let mut rest = message;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        if let Some(end) = after.find(']') {
            if let Ok(raw) = after[..end].parse::<u32>() {
                return Some(Pid::new(raw));
            }
        }
        rest = after;
    }
    None
}

/// Logger printing to stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Installs a console logger as the global logger
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = LogLevel::from(record.level());
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        // Nothing useful can be done if stderr is gone.
        let _ = writeln!(out, "[{} {}] {}", level.as_str(), record.target(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Logger capturing entries in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct RecordingLogger {
    level: LevelFilter,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

static GLOBAL_RECORDER: Once<RecordingLogger> = Once::new();

impl RecordingLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the process-wide recorder, installing it on first use
    ///
    /// Later calls return the same recorder whatever `level` they pass. If
    /// another logger was installed first, the recorder captures nothing.
    pub fn global(level: LevelFilter) -> &'static RecordingLogger {
        GLOBAL_RECORDER.call_once(|| {
            let recorder = RecordingLogger::new(level);
            if log::set_boxed_logger(Box::new(recorder.clone())).is_ok() {
                log::set_max_level(level);
            }
            recorder
        })
    }

    /// Copy of everything captured so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries logged under `target`
    pub fn entries_for_target(&self, target: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.field("target") == Some(target))
            .cloned()
            .collect()
    }

    /// Entries whose source is `pid`
    pub fn entries_for(&self, pid: Pid) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.source == Some(pid))
            .cloned()
            .collect()
    }

    /// Takes everything captured so far
    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.entries.lock().push(LogEntry::from_record(record));
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(logger: &dyn Log, level: Level, target: &str, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("{}", message))
                .build(),
        );
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_entry_with_fields() {
        let entry = LogEntry::new(LogLevel::Info, "test".to_string())
            .with_field("key1".to_string(), "value1".to_string())
            .with_field("key2".to_string(), "value2".to_string());

        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("key2"), Some("value2"));
        assert_eq!(entry.field("key3"), None);
        assert!(entry.source.is_none());
    }

    #[test]
    fn test_pid_is_picked_from_message() {
        assert_eq!(mentioned_pid("inserted|[12]3"), Some(Pid::new(12)));
        assert_eq!(mentioned_pid("[-]---,[4]sh"), Some(Pid::new(4)));
        assert_eq!(mentioned_pid("no pid here [x]"), None);
        assert_eq!(mentioned_pid("unclosed [7"), None);
    }

    #[test]
    fn test_recorder_captures_structured_entries() {
        let recorder = RecordingLogger::new(LevelFilter::Trace);
        emit(&recorder, Level::Trace, "deadline_queue", "inserted|[3]1");
        emit(&recorder, Level::Info, "schedlog", "5|[3]loop:4:0(1)(110)(5)");

        let entries = recorder.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Trace);
        assert_eq!(entries[0].source, Some(Pid::new(3)));
        assert_eq!(recorder.entries_for_target("schedlog").len(), 1);
        assert_eq!(recorder.entries_for(Pid::new(3)).len(), 2);
    }

    #[test]
    fn test_recorder_respects_level() {
        let recorder = RecordingLogger::new(LevelFilter::Warn);
        emit(&recorder, Level::Debug, "t", "hidden");
        emit(&recorder, Level::Error, "t", "shown");

        let entries = recorder.take();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "shown");
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn test_clones_share_buffer() {
        let recorder = RecordingLogger::new(LevelFilter::Info);
        let handle = recorder.clone();
        emit(&recorder, Level::Info, "t", "one");
        assert_eq!(handle.entries().len(), 1);
    }

    #[test]
    fn test_console_logger_filters() {
        let logger = ConsoleLogger::new(LevelFilter::Info);
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
