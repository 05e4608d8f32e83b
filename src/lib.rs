//! `external_links` finds the external URLs embedded in a web application's
//! source tree and checks that each one still answers `200 OK`.
//!
//! A run scans `*.{ts,tsx,js,jsx,html}` files, writes every unique link to
//! `external-links.json`, fetches them one at a time and writes the failures
//! to `external-broken-links.json`. Servers that only speak legacy TLS
//! renegotiation are retried once in a child process, see [`retry`].
//!
//! ```no_run
//! use external_links::{Checker, ClientBuilder, Excludes, Outcome, RetryEnv, SelfExec, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::default().build()?;
//!     let settings = Settings {
//!         root: "src".into(),
//!         output_dir: ".".into(),
//!         excludes: Excludes::default(),
//!     };
//!     let checker = Checker::new(settings, &client, &SelfExec, RetryEnv::from_env())?;
//!     assert_eq!(checker.run().await?, Outcome::Clean);
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate log;

mod checker;
mod client;
mod excludes;
mod types;

pub mod collector;
pub mod error_log;
pub mod extract;
pub mod retry;
#[cfg(test)]
pub(crate) mod test_utils;

pub use checker::{Checker, Outcome, Settings, BROKEN_LINKS_FILE, LINKS_FILE};
pub use client::{
    Client, ClientBuilder, Fetch, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use error_log::{ErrorLog, WriteMode, ERROR_LOG_FILE};
pub use excludes::Excludes;
pub use retry::{RetryEnv, SelfExec, Spawner};
pub use types::*;
