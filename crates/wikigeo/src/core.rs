//! The single-search facade.
//!
//! [`GeoSearcher`] turns coordinates, titles and keywords into normalized records:
//!
//! - **Nearby pages**: articles geotagged within a radius of a point
//! - **Page text**: the prose of one article, optionally truncated
//! - **Nearby images**: Commons files around a point, optionally ranked against a name
//! - **Page match**: articles matching a keyword that lie close to a point
//!
//! ```no_run
//! use wikigeo::{Coordinates, GeoSearcher, NearbyPagesParams, UserAgent, WikiGeoConfigBuilder};
//!
//! let config = WikiGeoConfigBuilder::new()
//!     .user_agent(&UserAgent::new("my-app", "me@example.org")?)
//!     .build()?;
//! let searcher = GeoSearcher::new(&config)?;
//! let pages = searcher.get_nearby_pages(
//!     Coordinates::new(51.43295, -0.51149),
//!     &NearbyPagesParams::default(),
//! )?;
//! # Ok::<(), wikigeo::error::WikiGeoError>(())
//! ```
use std::{sync::Arc, time::Instant};

use serde_json::Value;
use tracing::{debug, info, instrument};
use wikigeo_api::{
    ApiError, Endpoint, HttpTransport, ParseProp, RequestContext, Transport, WikiApi, query,
};

use crate::{
    config::WikiGeoConfig,
    error::{Result, WikiGeoError},
    geo::Coordinates,
    matching::rank_by_name,
    normalize::{ImageRecord, PageRecord, normalize_images, normalize_pages},
    search::{
        NearbyImagesParams, NearbyPagesParams, PAGE_MATCH_SEARCH_LIMIT, PageMatchParams,
        PageMatches, rank_page_matches,
    },
    text::{PageText, PageTextFetcher, check_text_limit, extract_page_text, truncate_chars},
};

/// Runs one search at a time against Wikipedia and Commons.
///
/// Holds no per-call state, so a single searcher (or its clones) can serve many threads.
#[derive(Debug, Clone)]
pub struct GeoSearcher {
    wikipedia: WikiApi,
    commons: WikiApi,
    pages: PageTextFetcher,
    config: WikiGeoConfig,
}

impl GeoSearcher {
    /// Searcher talking HTTP with the configured request timeout.
    ///
    /// The HTTP transport owns a tokio runtime and blocks on it for every request, so
    /// the searcher must not be used or dropped inside another tokio runtime;
    /// doing so panics. From async code, run it on a blocking thread or use
    /// [`with_transport`](Self::with_transport).
    pub fn new(config: &WikiGeoConfig) -> Result<Self> {
        let transport = HttpTransport::with_timeout(config.request_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Searcher sending every request through `transport`.
    #[instrument(name = "Initialize GeoSearcher", level = "debug", skip_all, fields(language = %config.language))]
    pub fn with_transport(config: &WikiGeoConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::wikipedia(config.language.as_str())?;
        let client = |endpoint: Endpoint| -> Result<WikiApi> {
            Ok(
                WikiApi::new(endpoint, config.user_agent.as_str(), transport.clone())?
                    .with_page_cooldown(config.page_cooldown)
                    .with_continuation(config.continuation),
            )
        };

        Ok(Self {
            wikipedia: client(endpoint.clone())?,
            commons: client(Endpoint::commons())?,
            pages: PageTextFetcher::new(endpoint, &config.user_agent, transport.clone()),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &WikiGeoConfig {
        &self.config
    }

    /// Articles geotagged within `params.radius` metres of `point`, in distance order.
    pub fn get_nearby_pages(
        &self,
        point: Coordinates,
        params: &NearbyPagesParams,
    ) -> Result<Vec<PageRecord>> {
        self.get_nearby_pages_with(point, params, &RequestContext::default())
    }

    #[instrument(name = "Nearby pages", level = "debug", skip(self, context))]
    pub fn get_nearby_pages_with(
        &self,
        point: Coordinates,
        params: &NearbyPagesParams,
        context: &RequestContext,
    ) -> Result<Vec<PageRecord>> {
        let query = query::nearby_search(point.lat, point.lon, params.limit, params.radius)?;
        let results = self.wikipedia.get_data_with(&query, context)?;
        normalize_pages(&results)
    }

    /// Prose of the article titled `title`, cut to `limit` characters when given.
    pub fn get_page_text(&self, title: &str, limit: Option<usize>) -> Result<PageText> {
        self.get_page_text_with(title, limit, &RequestContext::default())
    }

    pub fn get_page_text_with(
        &self,
        title: &str,
        limit: Option<usize>,
        context: &RequestContext,
    ) -> Result<PageText> {
        check_text_limit(limit)?;
        context.check()?;
        self.pages.fetch(title, limit)
    }

    /// Commons files within `params.radius` metres of `point`.
    ///
    /// With a name to match, every file gets a partial name-match score and the list is
    /// sorted by it, highest first; the match filter then drops files scoring at or
    /// below it. A filter without a name is a usage error.
    pub fn get_nearby_images(
        &self,
        point: Coordinates,
        params: &NearbyImagesParams,
    ) -> Result<Vec<ImageRecord>> {
        self.get_nearby_images_with(point, params, &RequestContext::default())
    }

    #[instrument(name = "Nearby images", level = "debug", skip(self, context))]
    pub fn get_nearby_images_with(
        &self,
        point: Coordinates,
        params: &NearbyImagesParams,
        context: &RequestContext,
    ) -> Result<Vec<ImageRecord>> {
        let name = params
            .name_to_match
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        if params.match_filter.is_some() && name.is_none() {
            return Err(WikiGeoError::usage(
                "a match filter needs a name to match against",
            ));
        }

        let query = query::commons_nearby(point.lat, point.lon, params.radius)?;
        let results = self.commons.get_data_with(&query, context)?;
        let mut images = normalize_images(&results)?;
        if let Some(name) = name {
            debug!(name, filter = ?params.match_filter, "Ranking images by name");
            rank_by_name(&mut images, name, params.match_filter);
        }
        Ok(images)
    }

    /// Articles matching `keyword` that lie near `point`.
    ///
    /// Runs a small string search for the keyword and hands the candidates to
    /// [`rank_page_matches`].
    pub fn get_page_match(
        &self,
        keyword: &str,
        point: Coordinates,
        params: &PageMatchParams,
    ) -> Result<PageMatches> {
        self.get_page_match_with(keyword, point, params, &RequestContext::default())
    }

    #[instrument(name = "Page match", level = "debug", skip(self, context))]
    pub fn get_page_match_with(
        &self,
        keyword: &str,
        point: Coordinates,
        params: &PageMatchParams,
        context: &RequestContext,
    ) -> Result<PageMatches> {
        let t_match = Instant::now();
        let query = query::string_search(&keyword.to_lowercase(), PAGE_MATCH_SEARCH_LIMIT)?;
        let results = self.wikipedia.get_data_with(&query, context)?;
        let candidates = normalize_pages(&results)?;
        let matches = rank_page_matches(candidates, keyword, point, params);
        info!(
            elapsed_seconds = ?t_match.elapsed(),
            matches = matches.page_matches.len(),
            "Page match complete"
        );
        Ok(matches)
    }

    /// Prose of `title` through the API's `parse` action instead of the rendered page.
    ///
    /// Extraction and truncation are the same as [`get_page_text`](Self::get_page_text);
    /// the title in the result is the one the server resolved, after redirects and
    /// normalization.
    #[instrument(name = "Parsed page text", level = "debug", skip(self))]
    pub fn parsed_page_text(&self, title: &str, limit: Option<usize>) -> Result<PageText> {
        check_text_limit(limit)?;
        let query = query::parse_page(title, &[ParseProp::Text])?;
        let response = self.wikipedia.send(&query)?;

        let parsed = response
            .get("parse")
            .ok_or_else(|| ApiError::MalformedResponse("no parse object in response".into()))?;
        let html = parsed
            .pointer("/text/*")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::MalformedResponse("parse response has no text".into()))?;
        let resolved = parsed.get("title").and_then(Value::as_str).unwrap_or(title);

        let text = extract_page_text(html);
        Ok(PageText {
            title: resolved.to_string(),
            text: match limit {
                Some(limit) => truncate_chars(&text, limit),
                None => text,
            },
        })
    }
}
