//! Wire-level access to the MediaWiki Action API used by `wikigeo`.
//!
//! This crate knows how to build the request parameter sets for the supported search
//! modes, send them through a [`Transport`], and follow the API's continuation
//! protocol until a complete [`ResultSet`] has been assembled. It does not interpret
//! the records beyond their raw schema; normalization and ranking live in `wikigeo`.
use std::time::Duration;

pub mod client;
pub mod endpoint;
pub mod query;
pub mod raw;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{ContinuationPolicy, Pages, RequestContext, WikiApi};
pub use endpoint::Endpoint;
pub use query::{ParseProp, Query};
pub use raw::{Coordinate, RawImage, RawPage, ResultSet};
pub use transport::{HttpTransport, Transport};

/// Cool-down between two pages of one paginated fetch.
pub const DEFAULT_PAGE_COOLDOWN: Duration = Duration::from_secs(1);
/// Per-request timeout applied by [`HttpTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ApiError {
        #[error("Invalid parameter: {0}")]
        Validation(String),
        #[error("Request failed (status {status:?}): {payload}")]
        Request {
            /// HTTP status, `None` when the server answered 200 with an `error` object.
            status: Option<u16>,
            /// Raw response body or error object, kept for diagnosis.
            payload: String,
        },
        #[error("Timed out: {0}")]
        Timeout(String),
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Malformed response: {0}")]
        MalformedResponse(String),
    }

    impl ApiError {
        pub(crate) fn validation(msg: impl Into<String>) -> Self {
            Self::Validation(msg.into())
        }

        /// Classifies a transport error, keeping timeouts distinct from other failures.
        pub(crate) fn from_transport(err: reqwest::Error) -> Self {
            if err.is_timeout() {
                Self::Timeout(err.to_string())
            } else {
                Self::Http(err)
            }
        }
    }

    pub type Result<T> = std::result::Result<T, ApiError>;
}

pub use error::{ApiError, Result};
