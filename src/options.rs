use clap::{ArgAction, Parser};
use external_links::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use std::path::PathBuf;

/// Find the external links embedded in a web application's source tree and
/// check that each one still answers `200 OK`.
///
/// Writes `external-links.json`, `external-broken-links.json` (only if some
/// links are broken) and `external-link-errors.log` to the output directory.
/// Every option can also be set in the environment or in a `.env` file.
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Options {
    /// Source tree to scan for links
    #[arg(long, env = "EXTERNAL_LINKS_ROOT", default_value = ".")]
    pub(crate) root: PathBuf,

    /// Directory the reports and the error log are written to
    #[arg(long, env = "EXTERNAL_LINKS_OUTPUT_DIR", default_value = ".")]
    pub(crate) output_dir: PathBuf,

    /// Website timeout in seconds from connect to response finished
    #[arg(long, env = "EXTERNAL_LINKS_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub(crate) timeout: u64,

    /// Maximum number of allowed redirects
    #[arg(long, env = "EXTERNAL_LINKS_MAX_REDIRECTS", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub(crate) max_redirects: usize,

    /// User agent
    #[arg(long, env = "EXTERNAL_LINKS_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub(crate) user_agent: String,

    /// Exclude URLs from checking (supports regex). URLs containing
    /// `sharepoint` or `fonts` are always excluded.
    #[arg(long, env = "EXTERNAL_LINKS_EXCLUDE", value_delimiter = ',')]
    pub(crate) exclude: Vec<String>,

    /// Verbose program output (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}
