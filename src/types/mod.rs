mod error;
mod link;
mod status;

pub use error::ErrorKind;
pub use link::{LinkRecord, LinkStatus};
pub use status::{Status, LEGACY_RENEGOTIATION_CODE, LEGACY_TLS_SENTINEL};

/// The library's `Result` type
pub type Result<T> = std::result::Result<T, ErrorKind>;
