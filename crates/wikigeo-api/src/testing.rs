//! In-memory [`Transport`] for tests that must not touch the network.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, PoisonError},
};

use serde_json::Value;

use crate::{ApiError, Query, Result, Transport};

type JsonHandler = dyn Fn(&str, &Query) -> Result<Value> + Send + Sync;

/// A request seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    /// `None` for plain page fetches.
    pub query: Option<Query>,
    pub user_agent: String,
}

/// Answers JSON requests from a handler and page fetches from a fixed url → body table,
/// recording every request it sees.
pub struct ScriptedTransport {
    json: Box<JsonHandler>,
    pages: HashMap<String, String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    /// Answers every JSON request with `handler(url, query)`.
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&str, &Query) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            json: Box::new(handler),
            pages: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers JSON requests with `responses` in order, failing once they run out.
    pub fn sequence(responses: impl IntoIterator<Item = Value>) -> Self {
        let queue = Mutex::new(responses.into_iter().collect::<VecDeque<_>>());
        Self::from_fn(move |url, _| {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .ok_or_else(|| ApiError::Request {
                    status: Some(404),
                    payload: format!("no scripted response left for {url}"),
                })
        })
    }

    /// Serves `body` for GETs of `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queries of the JSON requests, in the order they were sent.
    pub fn queries(&self) -> Vec<Query> {
        self.requests()
            .into_iter()
            .filter_map(|request| request.query)
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

impl Transport for ScriptedTransport {
    fn get_json(&self, url: &str, query: &Query, user_agent: &str) -> Result<Value> {
        self.record(RecordedRequest {
            url: url.to_string(),
            query: Some(query.clone()),
            user_agent: user_agent.to_string(),
        });
        (self.json)(url, query)
    }

    fn get_text(&self, url: &str, user_agent: &str) -> Result<String> {
        self.record(RecordedRequest {
            url: url.to_string(),
            query: None,
            user_agent: user_agent.to_string(),
        });
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Request {
                status: Some(404),
                payload: format!("no page scripted for {url}"),
            })
    }
}
