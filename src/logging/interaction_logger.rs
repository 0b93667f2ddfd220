// Per-session interaction log
//
// One plain-text file per session, opened once and only ever appended to.
// Line format: `{timestamp} - {LEVEL} - {message}`.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Severity of an interaction record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only log file for one session
pub struct InteractionLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl InteractionLogger {
    /// Open (creating if absent) the log file in append mode
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open interaction log: {}", path.display()))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Append one record
    pub fn record(&self, level: LogLevel, message: &str) -> Result<()> {
        let line = format_record(&timestamp(), level, message);
        debug!(path = %self.path.display(), "{}", line);

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("Interaction log lock poisoned"))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to write interaction log: {}", self.path.display()))?;

        Ok(())
    }

    pub fn info(&self, message: &str) -> Result<()> {
        self.record(LogLevel::Info, message)
    }

    pub fn error(&self, message: &str) -> Result<()> {
        self.record(LogLevel::Error, message)
    }

    /// Read back every record currently on disk
    pub fn records(&self) -> Result<Vec<String>> {
        read_records(&self.path)
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the lines of an interaction log file
pub fn read_records(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read interaction log: {}", path.display()))?;
    Ok(contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Session log file name, stamped with the session start time
pub fn session_log_file_name(session_id: &str) -> String {
    let short: String = session_id.chars().take(8).collect();
    format!("st_log_{}_{}.log", Local::now().format("%Y%m%d_%H%M%S"), short)
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}

fn format_record(timestamp: &str, level: LogLevel, message: &str) -> String {
    // One record per line, always
    let message = message.replace('\r', "\\r").replace('\n', "\\n");
    format!("{} - {} - {}", timestamp, level, message)
}
