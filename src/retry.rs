//! Retrying links that need legacy TLS renegotiation.
//!
//! OpenSSL only allows unsafe legacy renegotiation through process-wide
//! configuration, so the retry runs in a re-executed copy of this process
//! with `OPENSSL_CONF` pointing at a config that enables it. Parent and child
//! talk through environment variables and a result file:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `_RETRIED_LEGACY_TLS` | `1` in the child, never spawn again |
//! | `_RETRY_LEGACY_LINKS` | JSON array of `{file, url}` to retry |
//! | `_RETRY_LINK_URL` / `_RETRY_LINK_FILE` | a single link to retry |
//! | `_RETRY_RESULTS_FILE` | where the child writes its broken links |

use serde_json::Value;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use crate::error_log::WriteMode;
use crate::{ErrorKind, LinkRecord, LinkStatus, Result};

pub const RETRIED_LEGACY_TLS: &str = "_RETRIED_LEGACY_TLS";
pub const RETRY_LEGACY_LINKS: &str = "_RETRY_LEGACY_LINKS";
pub const RETRY_LINK_URL: &str = "_RETRY_LINK_URL";
pub const RETRY_LINK_FILE: &str = "_RETRY_LINK_FILE";
pub const RETRY_RESULTS_FILE: &str = "_RETRY_RESULTS_FILE";
pub const OPENSSL_CONF: &str = "OPENSSL_CONF";

const LEGACY_RENEGOTIATION_CONF: &str = "\
openssl_conf = openssl_init

[openssl_init]
ssl_conf = ssl_sect

[ssl_sect]
system_default = system_default_sect

[system_default_sect]
Options = UnsafeLegacyRenegotiation
";

/// Environment variables to pass to a spawned process
pub type EnvVars = Vec<(String, String)>;

/// The retry-related part of the process environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryEnv {
    /// This process already runs with legacy renegotiation enabled
    pub retried: bool,
    pub legacy_links: Option<String>,
    pub link_url: Option<String>,
    pub link_file: Option<String>,
    pub results_file: Option<PathBuf>,
}

/// What a run of the checker does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Scan the source tree and check every link
    Normal,
    /// Only re-check the links handed over by the parent process
    RetryBatch(Vec<LinkRecord>),
}

impl RetryEnv {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        RetryEnv {
            retried: var(RETRIED_LEGACY_TLS).is_some_and(|v| v == "1"),
            legacy_links: var(RETRY_LEGACY_LINKS),
            link_url: var(RETRY_LINK_URL),
            link_file: var(RETRY_LINK_FILE),
            results_file: var(RETRY_RESULTS_FILE).map(PathBuf::from),
        }
    }

    /// Decide the run mode.
    ///
    /// Retry payloads are only honoured together with the retried marker.
    /// A payload that is not a JSON array is an error.
    pub fn mode(&self) -> Result<RunMode> {
        if !self.retried {
            return Ok(RunMode::Normal);
        }
        if let Some(payload) = &self.legacy_links {
            return Ok(RunMode::RetryBatch(parse_batch(payload)?));
        }
        if let Some(url) = &self.link_url {
            let file = self.link_file.clone().unwrap_or_default();
            return Ok(RunMode::RetryBatch(vec![LinkRecord::new(file, url.as_str())]));
        }
        Ok(RunMode::Normal)
    }

    /// How a fatal error is written to the error log.
    ///
    /// Normally it replaces the log. A child reporting back to a parent
    /// shares the parent's log, so it appends instead of wiping the
    /// entries the parent already wrote.
    pub fn fatal_log_mode(&self) -> WriteMode {
        if self.retried && self.results_file.is_some() {
            WriteMode::Append
        } else {
            WriteMode::Truncate
        }
    }
}

/// Parse a retry batch, dropping entries without string `file` and `url`
pub fn parse_batch(payload: &str) -> Result<Vec<LinkRecord>> {
    let entries: Vec<Value> = serde_json::from_str(payload).map_err(ErrorKind::RetryPayload)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let file = entry.get("file").and_then(Value::as_str);
            let url = entry.get("url").and_then(Value::as_str);
            match (file, url) {
                (Some(file), Some(url)) => Some(LinkRecord::new(file, url)),
                _ => {
                    debug!("Dropping malformed retry entry: {entry}");
                    None
                }
            }
        })
        .collect())
}

/// Runs the legacy TLS retry in a separate process and waits for it
pub trait Spawner {
    /// Start the retry process with `env` added to the inherited environment.
    /// Returns its exit code, `None` if it was terminated by a signal.
    fn spawn(&self, env: &EnvVars) -> Result<Option<i32>>;
}

/// Re-executes the current binary with the same arguments and inherited stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SelfExec;

impl Spawner for SelfExec {
    fn spawn(&self, env: &EnvVars) -> Result<Option<i32>> {
        let exe = std::env::current_exe().map_err(ErrorKind::Spawn)?;
        let status = Command::new(exe)
            .args(std::env::args_os().skip(1))
            .envs(env.iter().map(|(k, v)| (k, v)))
            .status()
            .map_err(ErrorKind::Spawn)?;
        Ok(status.code())
    }
}

/// Temporary files shared with one retry process.
/// Both are removed when this is dropped.
#[derive(Debug)]
pub struct RetryHandoff {
    openssl_conf: NamedTempFile,
    results: NamedTempFile,
}

impl RetryHandoff {
    pub fn new() -> Result<Self> {
        let tmp = std::env::temp_dir();
        let mut openssl_conf = NamedTempFile::new().map_err(|e| ErrorKind::io(&tmp, e))?;
        openssl_conf
            .write_all(LEGACY_RENEGOTIATION_CONF.as_bytes())
            .map_err(|e| ErrorKind::io(openssl_conf.path(), e))?;
        let results = NamedTempFile::new().map_err(|e| ErrorKind::io(&tmp, e))?;
        Ok(RetryHandoff {
            openssl_conf,
            results,
        })
    }

    /// Environment for a child that retries `batch`
    pub fn env(&self, batch: &[LinkRecord]) -> Result<EnvVars> {
        let payload = serde_json::to_string(batch)
            .map_err(|e| ErrorKind::Json(RETRY_LEGACY_LINKS.to_string(), e))?;
        Ok(vec![
            (
                OPENSSL_CONF.to_string(),
                self.openssl_conf.path().display().to_string(),
            ),
            (RETRIED_LEGACY_TLS.to_string(), "1".to_string()),
            (RETRY_LEGACY_LINKS.to_string(), payload),
            (
                RETRY_RESULTS_FILE.to_string(),
                self.results.path().display().to_string(),
            ),
        ])
    }

    /// Broken links reported by the child, `None` if it wrote nothing
    pub fn read_results(&self) -> Result<Option<Vec<LinkStatus>>> {
        let path = self.results.path();
        let mut content = String::new();
        self.results
            .reopen()
            .and_then(|mut file| file.read_to_string(&mut content))
            .map_err(|e| ErrorKind::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ErrorKind::Json(path.display().to_string(), e))
    }
}
