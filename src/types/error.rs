use std::path::PathBuf;
use thiserror::Error;

/// Possible errors when scanning sources and checking links.
///
/// A broken link is not an error. These are the failures the tool cannot
/// turn into a [`Status`](crate::Status) or a log line.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Any form of I/O error occurred while reading from or writing to a path.
    #[error("Failed to access path: `{}`, reason: {1}", .0.display())]
    IoError(PathBuf, #[source] std::io::Error),
    /// An output artifact, result file or retry payload could not be (de)serialized
    #[error("Cannot (de)serialize JSON for {0}")]
    Json(String, #[source] serde_json::Error),
    /// The HTTP client could not be built
    #[error("Cannot build HTTP client")]
    BuildClient(#[from] reqwest::Error),
    /// The given user agent is not a valid header value
    #[error("Invalid user agent: {0}")]
    InvalidUserAgent(String),
    /// An exclude pattern is not a valid regular expression
    #[error("Invalid exclude pattern")]
    InvalidExclude(#[from] regex::Error),
    /// A glob pattern for ignored files is invalid
    #[error("UNIX glob pattern is invalid")]
    InvalidGlobPattern(#[from] glob::PatternError),
    /// The retry payload handed over from the parent process is not a JSON array
    #[error("Malformed legacy TLS retry payload")]
    RetryPayload(#[source] serde_json::Error),
    /// The legacy TLS retry process could not be started
    #[error("Cannot spawn legacy TLS retry process")]
    Spawn(#[source] std::io::Error),
}

impl ErrorKind {
    /// Wrap an I/O error together with the path it happened on
    pub fn io<P: Into<PathBuf>>(path: P, error: std::io::Error) -> Self {
        Self::IoError(path.into(), error)
    }
}
