//! The seam between the API client and HTTP.
use std::{sync::Arc, time::Duration};

use reqwest::{Client, Response, header::USER_AGENT};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, instrument};

use crate::{ApiError, DEFAULT_REQUEST_TIMEOUT, Query, Result};

/// Threads of the runtime driving HTTP I/O. Callers block on their own threads, so
/// the runtime only needs enough workers to keep sockets serviced.
const IO_THREADS: usize = 2;

/// Sends GET requests on behalf of [`crate::WikiApi`] and the page-text fetcher.
///
/// Implementations must be shareable across worker threads; every call carries all of
/// its request state in its arguments.
pub trait Transport: Send + Sync {
    /// GET `url` with `query` as URL parameters and decode the JSON body.
    ///
    /// A non-success status fails with [`ApiError::Request`] carrying the body.
    fn get_json(&self, url: &str, query: &Query, user_agent: &str) -> Result<Value>;

    /// GET `url` and return the body as text.
    fn get_text(&self, url: &str, user_agent: &str) -> Result<String>;
}

/// [`Transport`] over a pooled `reqwest` client driven by a private tokio runtime.
///
/// Calls block the calling thread until the response is in. Making a call, or dropping
/// the last clone, from inside another tokio runtime panics. Clones share the client and
/// the runtime.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    runtime: Arc<Runtime>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Transport whose requests fail with [`ApiError::Timeout`] after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::from_client(client)
    }

    pub fn from_client(client: Client) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(IO_THREADS)
            .thread_name("wikigeo-http")
            .enable_all()
            .build()?;
        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let payload = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        Err(ApiError::Request {
            status: Some(status.as_u16()),
            payload,
        })
    }
}

impl Transport for HttpTransport {
    #[instrument(name = "HTTP GET json", level = "trace", skip_all, fields(url = %url))]
    fn get_json(&self, url: &str, query: &Query, user_agent: &str) -> Result<Value> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .query(&query.iter().collect::<Vec<_>>())
                .header(USER_AGENT, user_agent)
                .send()
                .await
                .map_err(ApiError::from_transport)?;
            debug!(status = %response.status(), "Received API response");
            Self::check_status(response)
                .await?
                .json::<Value>()
                .await
                .map_err(ApiError::from_transport)
        })
    }

    #[instrument(name = "HTTP GET text", level = "trace", skip_all, fields(url = %url))]
    fn get_text(&self, url: &str, user_agent: &str) -> Result<String> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .header(USER_AGENT, user_agent)
                .send()
                .await
                .map_err(ApiError::from_transport)?;
            debug!(status = %response.status(), "Received page response");
            Self::check_status(response)
                .await?
                .text()
                .await
                .map_err(ApiError::from_transport)
        })
    }
}
