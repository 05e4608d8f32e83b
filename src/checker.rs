use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::client::Fetch;
use crate::collector::Collector;
use crate::error_log::ErrorLog;
use crate::retry::{RetryEnv, RetryHandoff, RunMode, Spawner};
use crate::{ErrorKind, Excludes, LinkRecord, LinkStatus, Result, Status};

/// Every deduplicated link found in the source tree
pub const LINKS_FILE: &str = "external-links.json";
/// Links whose final status is not `200`
pub const BROKEN_LINKS_FILE: &str = "external-broken-links.json";

/// Where to look and where to write
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub excludes: Excludes,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every checked link returned `200`
    Clean,
    /// At least one link is broken
    Broken,
}

/// Drives a complete run: scan, check, retry, report.
///
/// Links are checked strictly one after another.
pub struct Checker<'a> {
    collector: Collector,
    fetcher: &'a dyn Fetch,
    spawner: &'a dyn Spawner,
    log: ErrorLog,
    output_dir: PathBuf,
    retry: RetryEnv,
}

impl<'a> Checker<'a> {
    pub fn new(
        settings: Settings,
        fetcher: &'a dyn Fetch,
        spawner: &'a dyn Spawner,
        retry: RetryEnv,
    ) -> Result<Self> {
        Ok(Checker {
            collector: Collector::new(&settings.root, settings.excludes)?,
            fetcher,
            spawner,
            log: ErrorLog::new(&settings.output_dir),
            output_dir: settings.output_dir,
            retry,
        })
    }

    pub async fn run(&self) -> Result<Outcome> {
        match self.retry.mode()? {
            RunMode::RetryBatch(batch) => self.run_retry_batch(batch).await,
            RunMode::Normal => self.run_normal().await,
        }
    }

    /// Child side of the legacy TLS retry. Never spawns.
    ///
    /// The broken subset is always written, even if empty: to the result
    /// file the parent asked for, or to the broken-links artifact otherwise.
    async fn run_retry_batch(&self, batch: Vec<LinkRecord>) -> Result<Outcome> {
        info!("Retrying {} links with legacy TLS renegotiation", batch.len());
        let mut broken = Vec::new();
        for link in batch {
            let status = LinkStatus::new(link.clone(), self.fetcher.fetch(&link, &self.log).await?);
            if status.is_broken() {
                broken.push(status);
            }
        }

        let target = match &self.retry.results_file {
            Some(path) => path.clone(),
            None => self.output_dir.join(BROKEN_LINKS_FILE),
        };
        write_json(&target, &broken)?;
        Ok(outcome(&broken))
    }

    async fn run_normal(&self) -> Result<Outcome> {
        let broken_links_file = self.output_dir.join(BROKEN_LINKS_FILE);
        remove_stale(&broken_links_file)?;

        let files = self.collector.files(&self.log)?;
        let links = self.collector.collect_links(&files, &self.log)?;
        info!(
            "Found {} external links in {} files under {}",
            links.len(),
            files.len(),
            self.collector.root().display()
        );
        write_json(&self.output_dir.join(LINKS_FILE), &links)?;

        let mut results = Vec::with_capacity(links.len());
        let mut legacy_links = Vec::new();
        for link in links {
            let status = self.fetcher.fetch(&link, &self.log).await?;
            // After a retry has happened, legacy failures are final
            if status.is_legacy_tls() && !self.retry.retried {
                legacy_links.push(link);
            } else {
                results.push(LinkStatus::new(link, status));
            }
        }

        if !legacy_links.is_empty() {
            results.extend(self.retry_legacy(legacy_links)?);
        }

        let broken: Vec<_> = results.into_iter().filter(LinkStatus::is_broken).collect();
        if broken.is_empty() {
            info!("No broken links");
        } else {
            info!(
                "{} broken links, see {}",
                broken.len(),
                broken_links_file.display()
            );
            for link in &broken {
                info!("{link}");
            }
            write_json(&broken_links_file, &broken)?;
        }
        Ok(outcome(&broken))
    }

    /// Re-check `batch` in a single child process and merge its verdict.
    ///
    /// The child reports its broken links back through a result file. If it
    /// reports nothing, the whole batch counts as broken.
    fn retry_legacy(&self, batch: Vec<LinkRecord>) -> Result<Vec<LinkStatus>> {
        info!(
            "Re-running {} links with legacy TLS renegotiation enabled",
            batch.len()
        );
        let handoff = RetryHandoff::new()?;
        let code = self.spawner.spawn(&handoff.env(&batch)?)?;
        debug!("Legacy TLS retry exited with {code:?}");

        if let Some(broken) = handoff.read_results()? {
            return Ok(broken);
        }
        let reason = match code {
            Some(code) => format!("legacy TLS retry exited with code {code}"),
            None => "legacy TLS retry was terminated by a signal".to_string(),
        };
        warn!("{reason} without reporting results");
        Ok(batch
            .into_iter()
            .map(|link| LinkStatus::new(link, Status::Error(reason.clone())))
            .collect())
    }
}

fn outcome(broken: &[LinkStatus]) -> Outcome {
    if broken.is_empty() {
        Outcome::Clean
    } else {
        Outcome::Broken
    }
}

/// Remove the broken-links artifact of an earlier run
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(ErrorKind::io(path, e)),
        _ => Ok(()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| ErrorKind::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| ErrorKind::Json(path.display().to_string(), e))?;
    writer.flush().map_err(|e| ErrorKind::io(path, e))
}
