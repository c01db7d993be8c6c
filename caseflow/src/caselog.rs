//! Per-test-case file logging.
//!
//! Every test case (and every module-level stage) logs to its own file so
//! output stays isolated. Log writes never raise: if the destination cannot
//! be created or written, lines are dropped with a `tracing` warning and
//! execution continues.

use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A log destination owned by one test case.
pub struct CaseLogger {
    path: PathBuf,
    file: Option<Mutex<File>>,
}

impl CaseLogger {
    /// Creates `<log_dir>/<name>.log`, creating the directory as needed.
    ///
    /// Creation failures degrade to a discarding logger rather than an
    /// error; the Logger contract only requires that writes do not raise.
    #[must_use]
    pub fn create(log_dir: &Path, name: &str) -> Self {
        let path = log_dir.join(format!("{name}.log"));
        let file = std::fs::create_dir_all(log_dir)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
            .map_err(|err| {
                tracing::warn!(path = %path.display(), error = %err, "failed to open case log");
                err
            })
            .ok();
        Self {
            path,
            file: file.map(Mutex::new),
        }
    }

    /// A logger that drops every line. Used where no log directory exists.
    #[must_use]
    pub fn discard() -> Self {
        Self {
            path: PathBuf::new(),
            file: None,
        }
    }

    /// Appends one timestamped line.
    pub fn info(&self, line: impl AsRef<str>) {
        let Some(file) = &self.file else { return };
        let stamped = format!(
            "{} INFO {}",
            Utc::now().format("%Y-%m-%d-%H:%M:%S%.3f"),
            line.as_ref()
        );
        if let Err(err) = writeln!(file.lock(), "{stamped}") {
            tracing::warn!(path = %self.path.display(), error = %err, "case log write failed");
        }
    }

    /// The log file path (empty for a discarding logger).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for CaseLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseLogger")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .finish()
    }
}
