//! `check-external-links` scans a web application's sources for external
//! links and checks each of them.
//!
//! Run it without arguments from the application directory:
//! ```sh
//! check-external-links
//! ```
//!
//! Or point it somewhere else:
//! ```sh
//! check-external-links --root apps/web/src --output-dir reports -v
//! ```
//!
//! The exit code is `0` when every link answered `200 OK`, and `1` when
//! links are broken or the run itself failed. Details end up in
//! `external-broken-links.json` and `external-link-errors.log`.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, warn};
use std::time::Duration;

use external_links::{
    Checker, ClientBuilder, ErrorLog, Excludes, Outcome, RetryEnv, SelfExec, Settings,
};
#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature

mod logging;
mod options;

use logging::init_logging;
use options::Options;

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // Broken links and unexpected errors alike, the reports tell them apart
    Failure = 1,
}

fn main() {
    // Values already present in the environment take precedence over `.env`
    let dotenv = dotenvy::dotenv();
    let opts = Options::parse();
    init_logging(opts.verbose);

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    let retry = RetryEnv::from_env();
    let fatal_mode = retry.fatal_log_mode();
    let error_log = ErrorLog::new(&opts.output_dir);
    let exit_code = match run_main(&opts, retry) {
        Ok(Outcome::Clean) => ExitCode::Success,
        Ok(Outcome::Broken) => ExitCode::Failure,
        Err(e) => {
            if let Err(log_error) = error_log.write(&format!("{e:?}"), None, fatal_mode) {
                warn!(
                    "Cannot write error log `{}`: {log_error}",
                    error_log.path().display()
                );
            }
            ExitCode::Failure
        }
    };
    // std::process::exit doesn't run destructors, everything is dropped by now
    std::process::exit(exit_code as i32);
}

/// Set up client, checker and runtime, then run the check
fn run_main(opts: &Options, retry: RetryEnv) -> Result<Outcome> {
    let client = ClientBuilder::default()
        .user_agent(opts.user_agent.clone())
        .timeout(Duration::from_secs(opts.timeout))
        .max_redirects(opts.max_redirects)
        .legacy_tls_retried(retry.retried)
        .build()
        .context("Cannot build HTTP client")?;

    let settings = Settings {
        root: opts.root.clone(),
        output_dir: opts.output_dir.clone(),
        excludes: Excludes::new(opts.exclude.as_slice()).context("Invalid exclude pattern")?,
    };
    let checker = Checker::new(settings, &client, &SelfExec, retry)?;

    // Links are checked one at a time, a single thread is all we need
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Cannot start async runtime")?;
    Ok(runtime.block_on(checker.run())?)
}
