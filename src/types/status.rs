use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;

/// Status value recorded for links deferred to the legacy TLS retry pass
pub const LEGACY_TLS_SENTINEL: &str = "retried-with-legacy-tls";

/// Error code for servers that require unsafe legacy TLS renegotiation
pub const LEGACY_RENEGOTIATION_CODE: &str = "ERR_SSL_UNSAFE_LEGACY_RENEGOTIATION_DISABLED";

/// Response status of a link check
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Status {
    /// Final HTTP status code, after following redirects
    Code(u16),
    /// Low-level error (network, TLS, timeout) while fetching
    Error(String),
    /// Deferred to a retry with legacy TLS renegotiation enabled
    LegacyTlsRetry,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Code(200))
    }

    /// True for the retry sentinel and for errors carrying the legacy
    /// renegotiation code
    pub fn is_legacy_tls(&self) -> bool {
        match self {
            Status::LegacyTlsRetry => true,
            Status::Error(reason) => reason.contains(LEGACY_RENEGOTIATION_CODE),
            Status::Code(_) => false,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{code}"),
            Status::Error(reason) => f.write_str(reason),
            Status::LegacyTlsRetry => f.write_str(LEGACY_TLS_SENTINEL),
        }
    }
}

// Status codes are written as JSON numbers, everything else as strings
impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Status::Code(code) => serializer.serialize_u16(*code),
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Status::Code(code),
            Raw::Text(text) if text == LEGACY_TLS_SENTINEL => Status::LegacyTlsRetry,
            Raw::Text(text) => Status::Error(text),
        })
    }
}
