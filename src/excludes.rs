use regex::RegexSet;

use crate::Result;

/// URLs containing these (case-insensitive) are noise and never checked
const DEFAULT_EXCLUDES: &[&str] = &["(?i)sharepoint", "(?i)fonts"];

/// Exclude configuration for extracted links.
/// Any URL matching one of the patterns is dropped before it is recorded.
#[derive(Clone, Debug)]
pub struct Excludes {
    regex: RegexSet,
}

impl Excludes {
    /// Build the exclude set from the defaults plus user-provided regexes
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self> {
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(extra.iter().map(AsRef::as_ref));
        Ok(Excludes {
            regex: RegexSet::new(patterns)?,
        })
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

impl Default for Excludes {
    fn default() -> Self {
        Self {
            regex: RegexSet::new(DEFAULT_EXCLUDES).unwrap_or_else(|_| RegexSet::empty()),
        }
    }
}
