//! Event log of simulation state transitions
//!
//! Every transition the controller applies (creations, grants, waits,
//! releases, blocking, termination, detected deadlocks, resets) becomes one
//! JSON line. Entries are handed to a background writer thread over a
//! channel, so logging never holds up the simulation lock on file I/O, and
//! the log file can be replayed or visualized afterwards.

use crate::core::types::{Events, ProcessId, ResourceId, Transition};
use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Structure for a single log entry
#[derive(Debug, Serialize, Clone)]
pub struct LogEntry {
    /// Simulation version produced by the operation
    pub version: u64,
    /// Type of event that occurred
    pub event: Events,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    /// Absolute timestamp of when the event was logged (seconds since Unix Epoch)
    pub timestamp: f64,
}

/// Commands for controlling the writer thread
#[derive(Debug)]
enum LoggerCommand {
    /// Write a log entry to the file
    LogEntry(LogEntry),
    /// Flush all pending entries to disk and signal completion
    Flush(Sender<()>),
}

/// Event logger writing JSON lines from a background thread
pub struct EventLogger {
    /// Channel sender for communication with the writer thread
    sender: Sender<LoggerCommand>,
    /// Set while a flush is in progress
    flushing: AtomicBool,
    /// File the writer thread appends to
    path: PathBuf,
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        // Flush so entries are not lost if the program exits right after
        if let Err(e) = self.flush() {
            eprintln!("Warning: Failed to flush logs during EventLogger drop: {e:?}");
        }
    }
}

impl EventLogger {
    /// Create a logger writing to `path`
    ///
    /// A `{timestamp}` placeholder in the path is replaced with the current
    /// time. Missing parent directories are created and an existing file is
    /// truncated.
    ///
    /// # Errors
    /// Returns an error if the directory or the file could not be created.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();

        #[allow(clippy::literal_string_with_formatting_args)]
        let file_path = if path_buf.to_string_lossy().contains("{timestamp}") {
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(
                path_buf
                    .to_string_lossy()
                    .replace("{timestamp}", &timestamp.to_string()),
            )
        } else {
            path_buf
        };

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&file_path)
            .with_context(|| format!("Failed to open log file {}", file_path.display()))?;

        let (tx, rx) = unbounded::<LoggerCommand>();
        thread::Builder::new()
            .name("deadsim-logger".into())
            .spawn(move || writer_thread(file, rx))
            .context("Failed to spawn logger thread")?;

        Ok(EventLogger {
            sender: tx,
            flushing: AtomicBool::new(false),
            path: file_path,
        })
    }

    /// Path of the file being written, after placeholder expansion
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a transition recorded by the controller
    ///
    /// Non-blocking; a closed channel is reported on stderr and otherwise ignored.
    pub fn log_transition(&self, transition: &Transition) {
        let now = Utc::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1_000_000.0;

        let entry = LogEntry {
            version: transition.version,
            event: transition.event,
            process_id: transition.process_id,
            resource_id: transition.resource_id,
            units: transition.units,
            timestamp,
        };

        if let Err(e) = self.sender.send(LoggerCommand::LogEntry(entry)) {
            eprintln!("Failed to send log entry: {e:?}");
        }
    }

    /// Force flush all pending log entries to disk
    ///
    /// Blocks until the writer thread has written everything sent before this
    /// call.
    ///
    /// # Errors
    /// Returns an error if the writer thread is gone or does not answer in time.
    pub fn flush(&self) -> Result<()> {
        // Only one flush at a time
        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let result = (|| {
            let (flush_tx, flush_rx) = bounded(1);
            self.sender
                .send(LoggerCommand::Flush(flush_tx))
                .map_err(|_| anyhow::anyhow!("Logger thread is not running"))?;

            flush_rx
                .recv_timeout(Duration::from_secs(10))
                .map_err(|_| anyhow::anyhow!("Flush operation timed out"))
        })();

        self.flushing.store(false, Ordering::SeqCst);
        result
    }
}

/// Writer thread: serializes entries and writes them through a `BufWriter`
///
/// Runs until every sender is dropped, then performs a final flush.
fn writer_thread(file: File, rx: Receiver<LoggerCommand>) {
    let mut writer = BufWriter::new(file);

    while let Ok(cmd) = rx.recv() {
        match cmd {
            LoggerCommand::LogEntry(entry) => {
                if let Ok(json) = serde_json::to_string(&entry)
                    && let Err(e) = writeln!(writer, "{json}")
                {
                    eprintln!("Logger write error: {e:?}");
                }
            }
            LoggerCommand::Flush(responder) => {
                if let Err(e) = writer.flush() {
                    eprintln!("Logger flush error: {e:?}");
                }
                let _ = responder.send(());
            }
        }
    }

    if let Err(e) = writer.flush() {
        eprintln!("Logger final flush error: {e:?}");
    }
}
