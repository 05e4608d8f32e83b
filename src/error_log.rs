use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the diagnostic log, relative to the output directory
pub const ERROR_LOG_FILE: &str = "external-link-errors.log";

/// How an entry is written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Add the entry to the end of the log, creating it if needed
    Append,
    /// Replace the whole log with this entry
    Truncate,
}

/// Plain-text diagnostic log for scan and fetch failures
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ErrorLog {
            path: dir.as_ref().join(ERROR_LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one entry, prefixed with the source file it concerns (if any)
    pub fn write(&self, message: &str, file: Option<&Path>, mode: WriteMode) -> io::Result<()> {
        let entry = match file {
            Some(file) => format!("{}: {message}\n", file.display()),
            None => format!("{message}\n"),
        };
        warn!("{}", entry.trim_end());

        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.write(true).truncate(true),
        };
        let mut log = options.create(true).open(&self.path)?;
        log.write_all(entry.as_bytes())
    }

    pub fn append(&self, message: &str, file: Option<&Path>) -> io::Result<()> {
        self.write(message, file, WriteMode::Append)
    }
}
