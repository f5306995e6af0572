//! The paginated API client.
//!
//! A logical search can span several responses: whenever a response carries a `continue`
//! object, its tokens are merged into the next query and the request is repeated. The
//! walk is strictly sequential because each page depends on the previous page's tokens.
//!
//! The walk stops when
//! - a response has no `continue` object,
//! - a response is identical to the one before it (a guard against server-side
//!   pagination loops), or
//! - under [`ContinuationPolicy::UntilBatchComplete`], a response carries `batchcomplete`.
//!   The server sends it once every property of the current generator batch has been
//!   delivered; continuing past it would pull in the *next* batch of generator results,
//!   beyond the limit the caller asked for.
use std::{
    fmt,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    ApiError, DEFAULT_PAGE_COOLDOWN, Endpoint, Query, Result, ResultSet, Transport,
};

/// When a paginated fetch is considered finished, beyond the absence of `continue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContinuationPolicy {
    /// Stop at the first response marked `batchcomplete`.
    #[default]
    UntilBatchComplete,
    /// Follow `continue` for as long as the server sends it.
    Exhaustive,
}

/// Per-call request state. Nothing here is shared between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(ApiError::Timeout("deadline passed before the request was sent".into()))
        } else {
            Ok(())
        }
    }
}

/// Client for one API endpoint.
///
/// `WikiApi` holds no in-flight state: every call builds its own queries, so one value
/// (or its clones) can be used from many threads at once.
#[derive(Clone)]
pub struct WikiApi {
    endpoint: Endpoint,
    user_agent: Arc<str>,
    transport: Arc<dyn Transport>,
    page_cooldown: Duration,
    continuation: ContinuationPolicy,
}

impl fmt::Debug for WikiApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiApi")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("page_cooldown", &self.page_cooldown)
            .field("continuation", &self.continuation)
            .finish_non_exhaustive()
    }
}

impl WikiApi {
    /// The user agent identifies the calling application and is required by the
    /// service's etiquette policy, so an empty one is rejected.
    pub fn new(
        endpoint: Endpoint,
        user_agent: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let user_agent = user_agent.into();
        if user_agent.trim().is_empty() {
            return Err(ApiError::validation(
                "a user agent identifying the application is required",
            ));
        }
        Ok(Self {
            endpoint,
            user_agent: user_agent.into(),
            transport,
            page_cooldown: DEFAULT_PAGE_COOLDOWN,
            continuation: ContinuationPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_page_cooldown(mut self, cooldown: Duration) -> Self {
        self.page_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_continuation(mut self, policy: ContinuationPolicy) -> Self {
        self.continuation = policy;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sends one query. A JSON body carrying an `error` object is a failed request even
    /// though the HTTP status was a success.
    pub fn send(&self, query: &Query) -> Result<Value> {
        debug!(?query, "Sending query");
        let response =
            self.transport
                .get_json(&self.endpoint.api_url(), query, &self.user_agent)?;
        if let Some(error) = response.get("error") {
            warn!(%error, "API returned an error object");
            return Err(ApiError::Request {
                status: None,
                payload: error.to_string(),
            });
        }
        Ok(response)
    }

    /// Lazily walks the pages of `query`.
    pub fn pages(&self, query: &Query, context: RequestContext) -> Pages<'_> {
        Pages {
            api: self,
            context,
            next_query: Some(query.clone()),
            previous: None,
            round: 0,
        }
    }

    /// Every page of `query`, merged.
    pub fn get_data(&self, query: &Query) -> Result<ResultSet> {
        self.get_data_with(query, &RequestContext::default())
    }

    #[instrument(name = "Get data", level = "debug", skip_all, fields(endpoint = %self.endpoint))]
    pub fn get_data_with(&self, query: &Query, context: &RequestContext) -> Result<ResultSet> {
        let t_fetch = Instant::now();
        let mut results = ResultSet::new();
        let mut rounds = 0_usize;
        for page in self.pages(query, *context) {
            results.absorb(&page?)?;
            rounds += 1;
        }
        debug!(
            rounds,
            records = results.len(),
            elapsed = ?t_fetch.elapsed(),
            "Fetched result set"
        );
        Ok(results)
    }

    fn next_query(&self, query: &Query, response: &Value) -> Option<Query> {
        let batch_complete = response.get("batchcomplete").is_some();
        let Some(tokens) = response.get("continue") else {
            if !batch_complete {
                warn!("Last page carries neither continue nor batchcomplete");
            }
            return None;
        };
        let Some(tokens) = tokens.as_object() else {
            warn!(%tokens, "Ignoring continue that is not an object");
            return None;
        };
        if batch_complete && self.continuation == ContinuationPolicy::UntilBatchComplete {
            debug!("Batch complete, not following continuation");
            return None;
        }
        debug!(?tokens, "Following continuation");
        Some(query.continued(tokens))
    }
}

/// Iterator over the responses of one paginated fetch. See [`WikiApi::pages`].
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct Pages<'a> {
    api: &'a WikiApi,
    context: RequestContext,
    next_query: Option<Query>,
    previous: Option<Value>,
    round: usize,
}

impl Iterator for Pages<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let query = self.next_query.take()?;
        if self.round > 0 && !self.api.page_cooldown.is_zero() {
            thread::sleep(self.api.page_cooldown);
        }
        if let Err(e) = self.context.check() {
            return Some(Err(e));
        }
        self.round += 1;

        let response = match self.api.send(&query) {
            Ok(response) => response,
            Err(e) => return Some(Err(e)),
        };
        if self.previous.as_ref() == Some(&response) {
            debug!(round = self.round, "Got the same page twice, stopping");
            return None;
        }

        self.next_query = self.api.next_query(&query, &response);
        self.previous = Some(response.clone());
        Some(Ok(response))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{query, testing::ScriptedTransport};

    const UA: &str = "wikigeo-tests (tests@example.org)";

    fn api(transport: &Arc<ScriptedTransport>) -> WikiApi {
        WikiApi::new(Endpoint::wikipedia("en").unwrap(), UA, transport.clone())
            .unwrap()
            .with_page_cooldown(Duration::ZERO)
    }

    fn page(id: u64, fields: Value) -> Value {
        let mut page = json!({"pageid": id, "title": format!("Page {id}")});
        if let (Some(page), Some(fields)) = (page.as_object_mut(), fields.as_object()) {
            page.extend(fields.clone());
        }
        page
    }

    #[test]
    fn test_single_page_without_continue() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({
            "batchcomplete": "",
            "query": {"pages": {"1": page(1, json!({})), "2": page(2, json!({}))}}
        })]));
        let results = api(&transport).get_data(&Query::new()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(transport.queries().len(), 1);
    }

    #[test]
    fn test_follows_continuation_and_merges() {
        let transport = Arc::new(ScriptedTransport::sequence([
            json!({
                "continue": {"cocontinue": "1|555", "continue": "||pageterms"},
                "query": {"pages": {"1": page(1, json!({"coordinates": [{"lat": 1.0, "lon": 2.0}]}))}}
            }),
            json!({
                "batchcomplete": "",
                "query": {"pages": {"1": page(1, json!({"terms": {"label": ["One"]}}))}}
            }),
        ]));
        let query = query::nearby_search(1.0, 2.0, 10, 1000).unwrap();
        let results = api(&transport).get_data(&query).unwrap();

        let merged = results.get("1").unwrap();
        assert!(merged.contains_key("coordinates"));
        assert!(merged.contains_key("terms"));

        let queries = transport.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], query);
        assert_eq!(queries[1].get("cocontinue"), Some("1|555"));
        assert_eq!(queries[1].get("continue"), Some("||pageterms"));
        assert_eq!(queries[1].get("ggscoord"), Some("1|2"));
    }

    #[test]
    fn test_stops_at_batchcomplete_with_continue() {
        // The server offers the next generator batch, which the default policy declines.
        let transport = Arc::new(ScriptedTransport::sequence([
            json!({
                "batchcomplete": "",
                "continue": {"gsroffset": 3, "continue": "gsroffset||"},
                "query": {"pages": {"1": page(1, json!({"index": 1}))}}
            }),
            json!({
                "batchcomplete": "",
                "query": {"pages": {"2": page(2, json!({"index": 4}))}}
            }),
        ]));
        let results = api(&transport).get_data(&Query::new()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(transport.queries().len(), 1);
    }

    #[test]
    fn test_exhaustive_policy_ignores_batchcomplete() {
        let transport = Arc::new(ScriptedTransport::sequence([
            json!({
                "batchcomplete": "",
                "continue": {"gsroffset": 3, "continue": "gsroffset||"},
                "query": {"pages": {"1": page(1, json!({"index": 1}))}}
            }),
            json!({
                "batchcomplete": "",
                "query": {"pages": {"2": page(2, json!({"index": 4}))}}
            }),
        ]));
        let results = api(&transport)
            .with_continuation(ContinuationPolicy::Exhaustive)
            .get_data(&Query::new())
            .unwrap();

        assert_eq!(results.len(), 2);
        let queries = transport.queries();
        assert_eq!(queries[1].get("gsroffset"), Some("3"));
    }

    #[test]
    fn test_identical_pages_break_the_loop() {
        let looping = json!({
            "continue": {"ggsoffset": "5", "continue": "ggsoffset||"},
            "query": {"pages": {"1": page(1, json!({}))}}
        });
        let transport = Arc::new(ScriptedTransport::from_fn(move |_, _| Ok(looping.clone())));
        let api = api(&transport);
        let pages = api
            .pages(&Query::new(), RequestContext::default())
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(pages.len(), 1, "the repeated page is not yielded");
        assert_eq!(transport.queries().len(), 2);
        assert_eq!(api.get_data(&Query::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_error_object_is_request_error() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({
            "error": {"code": "badcoord", "info": "Invalid coordinate provided"}
        })]));
        let err = api(&transport).get_data(&Query::new()).unwrap_err();

        match err {
            ApiError::Request { status, payload } => {
                assert_eq!(status, None);
                assert!(payload.contains("badcoord"));
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_mid_pagination_stops_iteration() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({
            "continue": {"continue": "||"},
            "query": {"pages": {"1": page(1, json!({}))}}
        })]));
        let api = api(&transport);
        let mut pages = api.pages(&Query::new(), RequestContext::default());

        assert!(pages.next().unwrap().is_ok());
        assert!(matches!(
            pages.next(),
            Some(Err(ApiError::Request { status: Some(404), .. }))
        ));
        assert!(pages.next().is_none());
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({"batchcomplete": ""})]));
        let results = api(&transport).get_data(&Query::new()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_user_agent_and_url_are_sent() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({"batchcomplete": ""})]));
        api(&transport).get_data(&Query::new()).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.user_agent, UA);
        assert_eq!(request.url, "https://en.wikipedia.org/w/api.php");
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::sequence([]));
        let err = WikiApi::new(Endpoint::commons(), "  ", transport).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_expired_deadline_times_out_before_sending() {
        let transport = Arc::new(ScriptedTransport::sequence([json!({"batchcomplete": ""})]));
        let context = RequestContext::with_deadline(Instant::now());
        let err = api(&transport)
            .get_data_with(&Query::new(), &context)
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_cooldown_between_pages() {
        let transport = Arc::new(ScriptedTransport::sequence([
            json!({"continue": {"continue": "||"}, "query": {"pages": {"1": page(1, json!({}))}}}),
            json!({"batchcomplete": "", "query": {"pages": {"2": page(2, json!({}))}}}),
        ]));
        let cooldown = Duration::from_millis(30);
        let t_start = Instant::now();
        let results = api(&transport)
            .with_page_cooldown(cooldown)
            .get_data(&Query::new())
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(t_start.elapsed() >= cooldown);
    }
}
