use async_trait::async_trait;
use derive_builder::Builder;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::error::Error as StdError;
use std::time::Duration;

use crate::error_log::ErrorLog;
use crate::{ErrorKind, LinkRecord, Result, Status, LEGACY_RENEGOTIATION_CODE};

/// Identifies the checker to the servers it visits
pub const DEFAULT_USER_AGENT: &str = concat!("check-external-links/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// OpenSSL's reason string for a refused legacy renegotiation
const OPENSSL_LEGACY_RENEGOTIATION: &str = "unsafe legacy renegotiation disabled";

/// Turns a link into a [`Status`]
#[async_trait]
pub trait Fetch: Sync {
    /// Check a single link. Failures to reach it are a [`Status`], not an
    /// error.
    async fn fetch(&self, link: &LinkRecord, log: &ErrorLog) -> Result<Status>;
}

/// Fetches links one at a time and turns every outcome into a [`Status`].
#[derive(Debug, Clone)]
pub struct Client {
    reqwest_client: reqwest::Client,
    timeout: Duration,
    legacy_tls_retried: bool,
}

/// Builder for [`Client`].
#[derive(Builder, Debug)]
#[builder(build_fn(skip))]
#[builder(setter(into))]
#[builder(name = "ClientBuilder")]
#[allow(dead_code)]
pub struct ClientBuilderInternal {
    /// Sent with every request
    user_agent: String,
    /// Hard limit for a single request, redirects included
    timeout: Duration,
    max_redirects: usize,
    /// Set in the process that already runs with legacy renegotiation
    /// enabled. Legacy TLS failures are then final instead of deferred.
    legacy_tls_retried: bool,
}

impl ClientBuilder {
    pub fn build(&self) -> Result<Client> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|_| ErrorKind::InvalidUserAgent(user_agent.clone()))?,
        );

        let max_redirects = self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);
        let reqwest_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()?;

        Ok(Client {
            reqwest_client,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            legacy_tls_retried: self.legacy_tls_retried.unwrap_or(false),
        })
    }
}

#[async_trait]
impl Fetch for Client {
    /// GET the link and report the final status code after redirects.
    ///
    /// Network, TLS and timeout failures become [`Status::Error`] (and are
    /// logged against the link's source file), or [`Status::LegacyTlsRetry`]
    /// when the server needs legacy renegotiation and this process has not
    /// been retried with it yet. The only error returned is a failure to
    /// write the error log.
    async fn fetch(&self, link: &LinkRecord, log: &ErrorLog) -> Result<Status> {
        debug!("Checking {link}");
        let request = self.reqwest_client.get(&link.url).timeout(self.timeout);
        match request.send().await {
            Ok(response) => Ok(Status::Code(response.status().as_u16())),
            Err(e) => self.classify(link, &e, log),
        }
    }
}

impl Client {
    fn classify(
        &self,
        link: &LinkRecord,
        error: &(dyn StdError + 'static),
        log: &ErrorLog,
    ) -> Result<Status> {
        let legacy = is_legacy_renegotiation(error);
        if legacy && !self.legacy_tls_retried {
            info!("{} requires legacy TLS renegotiation, deferring", link.url);
            return Ok(Status::LegacyTlsRetry);
        }

        log.append(
            &format!("Fetch error for {}: {error:?}", link.url),
            Some(link.file.as_path()),
        )
        .map_err(|e| ErrorKind::io(log.path(), e))?;

        let reason = error_reason(error);
        Ok(Status::Error(if legacy {
            format!("{LEGACY_RENEGOTIATION_CODE}: {reason}")
        } else {
            reason
        }))
    }
}

fn error_chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(error), |&e| e.source())
}

/// The error and its causes, outermost first
fn error_reason(error: &(dyn StdError + 'static)) -> String {
    error_chain(error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Check the whole error chain for a refused legacy renegotiation
fn is_legacy_renegotiation(error: &(dyn StdError + 'static)) -> bool {
    error_chain(error).any(|cause| {
        let message = cause.to_string();
        message.contains(LEGACY_RENEGOTIATION_CODE)
            || message.to_lowercase().contains(OPENSSL_LEGACY_RENEGOTIATION)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{get_mock_server, website};
    use pretty_assertions::assert_eq;
    use std::fmt;
    use std::fs;
    use std::io;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug)]
    struct HandshakeError(io::Error);

    impl fmt::Display for HandshakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("error trying to connect")
        }
    }

    impl StdError for HandshakeError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    fn legacy_error() -> HandshakeError {
        HandshakeError(io::Error::new(
            io::ErrorKind::Other,
            "error:0A000152:SSL routines:final_renegotiate:unsafe legacy renegotiation disabled",
        ))
    }

    #[tokio::test]
    async fn test_ok() {
        let mock_server = get_mock_server(200).await;
        let log_dir = tempfile::tempdir().unwrap();
        let status = ClientBuilder::default()
            .build()
            .unwrap()
            .fetch(&website(&mock_server.uri()), &ErrorLog::new(log_dir.path()))
            .await
            .unwrap();
        assert_eq!(status, Status::Code(200));
    }

    #[tokio::test]
    async fn test_nonexistent() {
        let mock_server = get_mock_server(404).await;
        let log_dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(log_dir.path());
        let status = ClientBuilder::default()
            .build()
            .unwrap()
            .fetch(&website(&mock_server.uri()), &log)
            .await
            .unwrap();
        assert_eq!(status, Status::Code(404));
        // HTTP-level failures are results, not fetch errors
        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", mock_server.uri())),
            )
            .mount(&mock_server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let log_dir = tempfile::tempdir().unwrap();
        let status = ClientBuilder::default()
            .build()
            .unwrap()
            .fetch(
                &website(&format!("{}/old", mock_server.uri())),
                &ErrorLog::new(log_dir.path()),
            )
            .await
            .unwrap();
        assert_eq!(status, Status::Code(200));
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_matcher("user-agent", "link-audit/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let log_dir = tempfile::tempdir().unwrap();
        let status = ClientBuilder::default()
            .user_agent("link-audit/1.0")
            .build()
            .unwrap()
            .fetch(&website(&mock_server.uri()), &ErrorLog::new(log_dir.path()))
            .await
            .unwrap();
        assert_eq!(status, Status::Code(200));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_delay = Duration::from_millis(500);
        let checker_timeout = Duration::from_millis(50);
        assert!(mock_delay > checker_timeout);

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(mock_delay))
            .mount(&mock_server)
            .await;

        let log_dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(log_dir.path());
        let link = website(&mock_server.uri());
        let status = ClientBuilder::default()
            .timeout(checker_timeout)
            .build()
            .unwrap()
            .fetch(&link, &log)
            .await
            .unwrap();

        assert!(matches!(status, Status::Error(_)));
        let logged = fs::read_to_string(log.path()).unwrap();
        assert!(logged.starts_with(&format!("{}: Fetch error for {}", link.file.display(), link.url)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then close the listener again
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let log_dir = tempfile::tempdir().unwrap();
        let status = ClientBuilder::default()
            .build()
            .unwrap()
            .fetch(
                &website(&format!("http://127.0.0.1:{port}/")),
                &ErrorLog::new(log_dir.path()),
            )
            .await
            .unwrap();
        assert!(matches!(status, Status::Error(_)));
    }

    #[test]
    fn test_invalid_user_agent() {
        let res = ClientBuilder::default().user_agent("bad\nagent").build();
        assert!(matches!(res, Err(ErrorKind::InvalidUserAgent(_))));
    }

    #[test]
    fn test_detect_legacy_renegotiation() {
        assert!(is_legacy_renegotiation(&legacy_error()));
        let other = HandshakeError(io::Error::new(io::ErrorKind::Other, "certificate expired"));
        assert!(!is_legacy_renegotiation(&other));
    }

    #[test]
    fn test_legacy_error_is_deferred_once() {
        let log_dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(log_dir.path());
        let link = website("https://legacy.example.com");

        let client = ClientBuilder::default().build().unwrap();
        let status = client.classify(&link, &legacy_error(), &log).unwrap();
        assert_eq!(status, Status::LegacyTlsRetry);
        assert!(!log.path().exists());

        let retried = ClientBuilder::default()
            .legacy_tls_retried(true)
            .build()
            .unwrap();
        let status = retried.classify(&link, &legacy_error(), &log).unwrap();
        assert!(matches!(&status, Status::Error(reason) if reason.starts_with(LEGACY_RENEGOTIATION_CODE)));
        assert!(status.is_legacy_tls());
        assert!(log.path().exists());
    }

    #[test]
    fn test_error_reason_joins_chain() {
        assert_eq!(
            error_reason(&legacy_error()),
            "error trying to connect: error:0A000152:SSL routines:final_renegotiate:unsafe legacy renegotiation disabled"
        );
    }
}
