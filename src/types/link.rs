use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;

use super::Status;

/// An external URL and the source file it was first found in.
///
/// Identity is the URL. The file is only kept to attribute failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Source file the URL was found in
    pub file: PathBuf,
    /// Raw URL text as matched in the source
    pub url: String,
}

impl LinkRecord {
    /// Create a new link record
    pub fn new<P: Into<PathBuf>, S: Into<String>>(file: P, url: S) -> Self {
        LinkRecord {
            file: file.into(),
            url: url.into(),
        }
    }
}

impl Display for LinkRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.file.display())
    }
}

/// The outcome of checking a [`LinkRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkStatus {
    pub file: PathBuf,
    pub url: String,
    pub status: Status,
}

impl LinkStatus {
    pub fn new(link: LinkRecord, status: Status) -> Self {
        LinkStatus {
            file: link.file,
            url: link.url,
            status,
        }
    }

    /// A link is broken unless it resolved to `200 OK`
    pub fn is_broken(&self) -> bool {
        !self.status.is_ok()
    }
}

impl Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.status, self.url, self.file.display())
    }
}
