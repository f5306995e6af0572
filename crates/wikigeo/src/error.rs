use thiserror::Error;
use wikigeo_api::ApiError;

#[derive(Error, Debug)]
pub enum WikiGeoError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Usage error: {0}")]
    Usage(String),
    #[error(
        "Batch of {requested} requests exceeds the limit of {limit}; \
         see https://www.mediawiki.org/wiki/API:Etiquette#Request_limit \
         or disable the batch limit in the configuration"
    )]
    BatchLimitExceeded { requested: usize, limit: usize },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WikiGeoError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// A parameter was outside its documented bounds.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Api(ApiError::Validation(_)))
    }

    /// The server rejected the request, by status or with an `error` object.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Api(ApiError::Request { .. }))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Api(ApiError::Timeout(_)))
    }
}

pub type Result<T> = std::result::Result<T, WikiGeoError>;
